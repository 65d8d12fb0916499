// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

use crate::error::LogError;
use log::error;
use nom::number::complete::le_u64;

/// ChunkSet compression algorithm value for LZ4 (the chunk envelope subtag)
pub(crate) const ALGORITHM_LZ4: u32 = 0x100;

/// Inflate a ChunkSet chunk body. The envelope subtag names the algorithm;
/// the body is the declared uncompressed size followed by an LZ4 block
/// stream that must produce exactly that many bytes
pub(crate) fn decompress_chunkset(algorithm: u32, body: &[u8]) -> Result<Vec<u8>, LogError> {
    if algorithm != ALGORITHM_LZ4 {
        error!("[aulogs] Unknown ChunkSet compression algorithm: {algorithm:#x}");
        return Err(LogError::Lz4Failure(format!(
            "unknown compression algorithm {algorithm:#x}"
        )));
    }

    let (compressed, uncompressed_size) =
        le_u64::<&[u8], nom::error::Error<&[u8]>>(body).map_err(|_| {
            LogError::Truncated {
                offset: 0,
                chunk_tag: crate::tracev3::tags::CHUNKSET,
            }
        })?;

    let size_usize = usize::try_from(uncompressed_size)
        .map_err(|_| LogError::Lz4Failure(String::from("uncompressed size overflows usize")))?;

    let decompressed = lz4_flex::block::decompress(compressed, size_usize).map_err(|err| {
        error!("[aulogs] Failed to decompress ChunkSet data: {err:?}");
        LogError::Lz4Failure(err.to_string())
    })?;

    if decompressed.len() != size_usize {
        error!(
            "[aulogs] ChunkSet inflated to {} bytes, expected {}",
            decompressed.len(),
            size_usize
        );
        return Err(LogError::Lz4Failure(format!(
            "inflated to {} bytes, expected {}",
            decompressed.len(),
            size_usize
        )));
    }
    Ok(decompressed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{decompress_chunkset, ALGORITHM_LZ4};
    use crate::error::LogError;

    /// Compress inner chunk bytes into a ChunkSet body
    pub(crate) fn test_chunkset_body(inner: &[u8]) -> Vec<u8> {
        let mut body = (inner.len() as u64).to_le_bytes().to_vec();
        body.extend_from_slice(&lz4_flex::block::compress(inner));
        body
    }

    #[test]
    fn test_decompress_roundtrip() {
        let inner = b"the quick brown fox jumps over the lazy dog, repeatedly, repeatedly";
        let body = test_chunkset_body(inner);
        let decompressed = decompress_chunkset(ALGORITHM_LZ4, &body).unwrap();
        assert_eq!(decompressed, inner);
    }

    #[test]
    fn test_decompress_size_mismatch() {
        let inner = b"some chunk data bytes";
        let mut body = test_chunkset_body(inner);
        // Declare a larger uncompressed size than the stream produces
        body[..8].copy_from_slice(&((inner.len() + 10) as u64).to_le_bytes());
        let result = decompress_chunkset(ALGORITHM_LZ4, &body);
        assert!(matches!(result, Err(LogError::Lz4Failure(_))));
    }

    #[test]
    fn test_decompress_unknown_algorithm() {
        let body = test_chunkset_body(b"data");
        let result = decompress_chunkset(0x200, &body);
        assert!(matches!(result, Err(LogError::Lz4Failure(_))));
    }

    #[test]
    fn test_decompress_garbage_stream() {
        let mut body = 64_u64.to_le_bytes().to_vec();
        body.extend_from_slice(&[0xff, 0xfe, 0xfd, 0x02, 0x01]);
        let result = decompress_chunkset(ALGORITHM_LZ4, &body);
        assert!(matches!(result, Err(LogError::Lz4Failure(_))));
    }
}
