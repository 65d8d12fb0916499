// Copyright 2026 The aulogs project authors. All Rights Reserved
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with the License. You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and limitations under the License.

//! Format string interpolation: printf conversions plus Apple's
//! `%{mods,type}` extensions, driven by the typed argument stream.

use crate::decoders::{self, Decoded};
use crate::reader::encode_standard;
use crate::tracev3::firehose::args::{ArgPrivacy, ArgValue, Argument};
use log::{error, warn};
use nom::branch::alt;
use nom::bytes::complete::{is_a, tag, take_until};
use nom::character::complete::{anychar, char as spec_char, digit1};
use nom::combinator::opt;
use nom::sequence::delimited;
use regex::Regex;

/// The rendered text for redacted arguments, exactly 9 bytes
pub const PRIVATE_TEXT: &str = "<private>";
/// Placeholder when the format string consumes more arguments than exist
pub const MISSING_ARG_TEXT: &str = "<missing arg>";

/// Compile the conversion matcher. Formatters are printf style with
/// additional Apple `%{...}` values
pub(crate) fn conversion_regex() -> Result<Regex, regex::Error> {
    /*
    (                                 # start of capture group 1
    %                                 # literal "%"
    (?:                               # first option

    (?:{[^}]+}?)                      # String formatters with %{<variable>} values. Ex: %{public}#llx
    (?:[-+0#]{0,5})                   # optional flags
    (?:\d+|\*)?                       # width
    (?:\.(?:\d+|\*))?                 # precision
    (?:h|hh|l|ll|t|q|w|I|z|j|I32|I64)?  # size
    [cCdiouxXeEfgGaAnpsSZPm@}]        # type

    |                                 # OR plain formatters, ex: %s, %d

    (?:[-+0 #]{0,5})                  # optional flags
    (?:\d+|\*)?                       # width
    (?:\.(?:\d+|\*))?                 # precision
    (?:h|hh|l|ll|w|I|t|q|z|j|I32|I64)?  # size
    [cCdiouxXeEfgGaAnpsSZPm@%]        # type
    ))
    */
    Regex::new(
        r"(%(?:(?:\{[^}]+}?)(?:[-+0#]{0,5})(?:\d+|\*)?(?:\.(?:\d+|\*))?(?:h|hh|l|ll|w|I|z|t|q|j|I32|I64)?[cmCdiouxXeEfgGaAnpsSZP@}]|(?:[-+0 #]{0,5})(?:\d+|\*)?(?:\.(?:\d+|\*))?(?:h|hh|l|ll|w|I|t|q|z|j|I32|I64)?[cmCdiouxXeEfgGaAnpsSZP@%]))",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrivacyMod {
    Public,
    Private,
    Sensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Num {
    None,
    Fixed(usize),
    /// `*`: the value arrives as the next argument
    Dynamic,
}

#[derive(Debug, Clone)]
struct ConvSpec {
    privacy_mod: Option<PrivacyMod>,
    mask_hash: bool,
    type_name: Option<String>,
    signpost_note: Option<String>,
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: Num,
    precision: Num,
    conv: char,
}

impl Default for Num {
    fn default() -> Self {
        Num::None
    }
}

impl Default for ConvSpec {
    fn default() -> Self {
        ConvSpec {
            privacy_mod: None,
            mask_hash: false,
            type_name: None,
            signpost_note: None,
            left: false,
            plus: false,
            space: false,
            zero: false,
            alt: false,
            width: Num::None,
            precision: Num::None,
            conv: 's',
        }
    }
}

// Parse one conversion specification:
// % [{mods,type}] [flags] [width] [.precision] [length] conv
fn parse_specifier(input: &str) -> nom::IResult<&str, ConvSpec> {
    let mut spec = ConvSpec::default();

    let (input, _) = tag("%")(input)?;
    let (input, braces) = opt(delimited(spec_char('{'), take_until("}"), spec_char('}')))(input)?;
    if let Some(contents) = braces {
        classify_mods(contents, &mut spec);
    }

    let (input, flag_chars) = opt(is_a("-+ 0#'"))(input)?;
    if let Some(flag_chars) = flag_chars {
        spec.left = flag_chars.contains('-');
        spec.plus = flag_chars.contains('+');
        spec.space = flag_chars.contains(' ');
        spec.zero = flag_chars.contains('0');
        spec.alt = flag_chars.contains('#');
    }

    let (input, width) = parse_num(input)?;
    spec.width = width;

    let (input, dot) = opt(spec_char('.'))(input)?;
    let (input, precision) = if dot.is_some() {
        parse_num(input)?
    } else {
        (input, Num::None)
    };
    spec.precision = precision;

    let (input, _length) = opt(alt((
        tag("hh"),
        tag("ll"),
        tag("I64"),
        tag("I32"),
        tag("h"),
        tag("l"),
        tag("j"),
        tag("z"),
        tag("t"),
        tag("q"),
        tag("w"),
        tag("I"),
    )))(input)?;

    let (input, conv) = anychar(input)?;
    spec.conv = conv;
    Ok((input, spec))
}

fn parse_num(input: &str) -> nom::IResult<&str, Num> {
    let (input, star) = opt(spec_char('*'))(input)?;
    if star.is_some() {
        return Ok((input, Num::Dynamic));
    }
    let (input, digits) = opt(digit1)(input)?;
    match digits {
        Some(value) => Ok((input, value.parse().map(Num::Fixed).unwrap_or(Num::None))),
        None => Ok((input, Num::None)),
    }
}

fn classify_mods(contents: &str, spec: &mut ConvSpec) {
    for token in contents.split(',') {
        let token = token.trim();
        match token {
            "" => {}
            "public" => spec.privacy_mod = Some(PrivacyMod::Public),
            "private" => spec.privacy_mod = Some(PrivacyMod::Private),
            "sensitive" => spec.privacy_mod = Some(PrivacyMod::Sensitive),
            "mask.hash" => spec.mask_hash = true,
            _ if token.starts_with("signpost") => {
                if spec.signpost_note.is_none() {
                    spec.signpost_note = Some(token.to_string());
                }
            }
            _ if token.starts_with("name=") => {}
            _ => {
                if spec.type_name.is_none() {
                    spec.type_name = Some(token.to_string());
                }
            }
        }
    }
}

/// Interpolate a format string with an entry's typed arguments.
/// `entry_private` is the firehose 0x0400 flag: every argument without an
/// explicit `%{public}` renders as `<private>`
pub fn format_log_message(
    format_string: &str,
    args: &[Argument],
    entry_private: bool,
    conversion_re: &Regex,
) -> String {
    // Some entries have neither a format string nor message data
    if format_string.is_empty() && args.is_empty() {
        return String::new();
    }
    if format_string.is_empty() {
        return render_bare_value(&args[0]);
    }

    struct Substitution {
        formatter: String,
        message: String,
    }

    let mut substitutions: Vec<Substitution> = Vec::new();
    let mut arg_index = 0;
    let mut reported_shortfall = false;

    for found in conversion_re.find_iter(format_string) {
        let formatter = found.as_str();

        // A literal "% " is not a conversion
        if formatter.starts_with("% ") {
            continue;
        }

        let spec = match parse_specifier(formatter) {
            Ok((_, spec)) => spec,
            Err(err) => {
                warn!("[aulogs] Failed to parse conversion {formatter:?}: {err:?}");
                continue;
            }
        };

        let message = match spec.conv {
            '%' => String::from("%"),
            'n' => {
                warn!("[aulogs] Rejected %n conversion in format string");
                String::new()
            }
            _ => {
                let mut next_arg = || {
                    let argument = args.get(arg_index);
                    if argument.is_some() {
                        arg_index += 1;
                    }
                    argument
                };

                // Dynamic width and precision pull integer arguments ahead
                // of the value
                let width = match spec.width {
                    Num::Fixed(value) => i64::try_from(value).ok(),
                    Num::Dynamic => next_arg().and_then(Argument::as_i64),
                    Num::None => None,
                };
                let precision = match spec.precision {
                    Num::Fixed(value) => Some(value),
                    Num::Dynamic => next_arg()
                        .and_then(Argument::as_i64)
                        .map(|value| value.max(0) as usize),
                    Num::None => None,
                };

                match next_arg() {
                    Some(argument) => {
                        render_argument(&spec, argument, width, precision, entry_private)
                    }
                    None => {
                        if !reported_shortfall {
                            warn!(
                                "[aulogs] Format string requires more arguments than provided: {format_string:?}"
                            );
                            reported_shortfall = true;
                        }
                        String::from(MISSING_ARG_TEXT)
                    }
                }
            }
        };

        substitutions.push(Substitution {
            formatter: formatter.to_string(),
            message,
        });
    }

    // Substitute by splitting at each formatter instead of replace, since a
    // replacement value may itself contain a conversion
    let mut remaining = format_string.to_string();
    let mut parts: Vec<String> = Vec::new();
    for substitution in substitutions {
        match remaining.split_once(&substitution.formatter) {
            Some((prefix, rest)) => {
                parts.push(prefix.to_string());
                parts.push(substitution.message);
                remaining = rest.to_string();
            }
            None => error!(
                "[aulogs] Failed to split message ({remaining}) at conversion: {}",
                substitution.formatter
            ),
        }
    }
    parts.push(remaining);
    parts.join("")
}

// An empty format string renders the argument itself
fn render_bare_value(argument: &Argument) -> String {
    match &argument.value {
        ArgValue::Text(value) => value.clone(),
        ArgValue::Scalar { .. } => argument.as_i64().map(|v| v.to_string()).unwrap_or_default(),
        ArgValue::Bytes(bytes) => encode_standard(bytes),
        ArgValue::PrivateRef { .. } | ArgValue::Missing => String::from(PRIVATE_TEXT),
    }
}

fn render_argument(
    spec: &ConvSpec,
    argument: &Argument,
    width: Option<i64>,
    precision: Option<usize>,
    entry_private: bool,
) -> String {
    // Privacy first. Sensitive data stays redacted no matter what the
    // format says; private data opens up only with an explicit public
    let redacted = if argument.privacy == ArgPrivacy::Sensitive
        || spec.privacy_mod == Some(PrivacyMod::Sensitive)
        || spec.privacy_mod == Some(PrivacyMod::Private)
    {
        true
    } else if spec.privacy_mod == Some(PrivacyMod::Public) {
        false
    } else {
        argument.privacy == ArgPrivacy::Private || entry_private
    };
    if redacted {
        return String::from(PRIVATE_TEXT);
    }

    if spec.mask_hash {
        // Hashed values arrive pre-masked; render the raw hash
        let value = match &argument.value {
            ArgValue::Bytes(bytes) => encode_standard(bytes),
            ArgValue::Text(value) => value.clone(),
            _ => render_conversion(spec, argument, width, precision),
        };
        return apply_signpost_note(spec, value);
    }

    if let Some(type_name) = &spec.type_name {
        match decoders::decode(type_name, argument) {
            Decoded::Value(value) => return apply_signpost_note(spec, value),
            Decoded::Error => return String::from("<decode error>"),
            Decoded::Unknown => {
                // An unregistered object decoder cannot be rendered; other
                // unknown types fall through to the plain conversion
                if spec.conv == 'P' {
                    return String::from("<decode error>");
                }
            }
        }
    }

    let value = render_conversion(spec, argument, width, precision);
    apply_signpost_note(spec, value)
}

fn apply_signpost_note(spec: &ConvSpec, value: String) -> String {
    match &spec.signpost_note {
        Some(note) => format!("{value} ({note})"),
        None => value,
    }
}

fn render_conversion(
    spec: &ConvSpec,
    argument: &Argument,
    width: Option<i64>,
    precision: Option<usize>,
) -> String {
    match spec.conv {
        'd' | 'i' | 'D' => {
            let value = argument.as_i64().unwrap_or_else(|| fallback_int(argument));
            format_signed(value, spec, width, precision)
        }
        'u' | 'U' => {
            let value = argument.as_u64().unwrap_or_else(|| fallback_int(argument) as u64);
            format_unsigned(value, 10, false, spec, width, precision)
        }
        'o' | 'O' => {
            let value = argument.as_u64().unwrap_or(0);
            format_unsigned(value, 8, false, spec, width, precision)
        }
        'x' => {
            let value = argument.as_u64().unwrap_or(0);
            format_unsigned(value, 16, false, spec, width, precision)
        }
        'X' => {
            let value = argument.as_u64().unwrap_or(0);
            format_unsigned(value, 16, true, spec, width, precision)
        }
        'p' => {
            let value = argument.as_u64().unwrap_or(0);
            let text = format!("0x{value:x}");
            pad_text(text, spec, width)
        }
        'c' | 'C' => {
            let text = match &argument.value {
                ArgValue::Text(value) => value.chars().take(1).collect(),
                _ => argument
                    .as_u64()
                    .and_then(|value| char::from_u32(value as u32))
                    .map(|value| value.to_string())
                    .unwrap_or_default(),
            };
            pad_text(text, spec, width)
        }
        's' | 'S' | '@' => {
            let mut text = match &argument.value {
                ArgValue::Text(value) => value.clone(),
                ArgValue::Scalar { .. } => argument
                    .as_i64()
                    .map(|value| value.to_string())
                    .unwrap_or_default(),
                ArgValue::Bytes(bytes) => encode_standard(bytes),
                ArgValue::PrivateRef { .. } | ArgValue::Missing => String::from(PRIVATE_TEXT),
            };
            // Precision truncates strings
            if let Some(precision) = precision {
                text.truncate(precision);
            }
            pad_text(text, spec, width)
        }
        'P' => {
            let text = match &argument.value {
                ArgValue::Bytes(bytes) => encode_standard(bytes),
                ArgValue::Text(value) => value.clone(),
                _ => String::from("<decode error>"),
            };
            pad_text(text, spec, width)
        }
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A' => {
            let value = argument.as_f64().unwrap_or(0.0);
            format_float(value, spec, width, precision)
        }
        'm' => {
            let errno = argument.as_u64().unwrap_or(0);
            crate::decoders::errno_string(errno)
        }
        unknown => {
            warn!("[aulogs] Unknown conversion type: {unknown}");
            render_bare_value(argument)
        }
    }
}

// Number items carry raw bits; string items holding digits still happen in
// oversize payloads
fn fallback_int(argument: &Argument) -> i64 {
    match &argument.value {
        ArgValue::Text(value) => value.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn format_signed(
    value: i64,
    spec: &ConvSpec,
    width: Option<i64>,
    precision: Option<usize>,
) -> String {
    let sign = if value < 0 {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let digits = value.unsigned_abs().to_string();
    assemble_number(sign, "", digits, spec, width, precision)
}

fn format_unsigned(
    value: u64,
    radix: u32,
    uppercase: bool,
    spec: &ConvSpec,
    width: Option<i64>,
    precision: Option<usize>,
) -> String {
    let digits = match radix {
        8 => format!("{value:o}"),
        16 if uppercase => format!("{value:X}"),
        16 => format!("{value:x}"),
        _ => value.to_string(),
    };
    let prefix = if spec.alt && value != 0 {
        match radix {
            8 => "0",
            16 if uppercase => "0X",
            16 => "0x",
            _ => "",
        }
    } else {
        ""
    };
    assemble_number("", prefix, digits, spec, width, precision)
}

// Combine sign, alternate form prefix, and digits, honoring precision
// (zero-pads digits) and width (zero or space pads)
fn assemble_number(
    sign: &str,
    prefix: &str,
    mut digits: String,
    spec: &ConvSpec,
    width: Option<i64>,
    precision: Option<usize>,
) -> String {
    if let Some(precision) = precision {
        while digits.len() < precision {
            digits.insert(0, '0');
        }
    }

    let (left, width) = resolve_width(spec, width);
    let body_len = sign.len() + prefix.len() + digits.len();
    if width <= body_len {
        return format!("{sign}{prefix}{digits}");
    }

    let pad = width - body_len;
    if spec.zero && !left && precision.is_none() {
        // Zero padding goes between the prefix and the digits
        format!("{sign}{prefix}{}{digits}", "0".repeat(pad))
    } else if left {
        format!("{sign}{prefix}{digits}{}", " ".repeat(pad))
    } else {
        format!("{}{sign}{prefix}{digits}", " ".repeat(pad))
    }
}

fn format_float(
    value: f64,
    spec: &ConvSpec,
    width: Option<i64>,
    precision: Option<usize>,
) -> String {
    let text = if value.is_nan() {
        String::from("nan")
    } else if value.is_infinite() {
        if value < 0.0 {
            String::from("-inf")
        } else {
            String::from("inf")
        }
    } else {
        match spec.conv {
            'e' => format!("{:.*e}", precision.unwrap_or(6), value),
            'E' => format!("{:.*e}", precision.unwrap_or(6), value).to_uppercase(),
            'g' | 'G' | 'a' | 'A' => format!("{value}"),
            _ => {
                let mut text = format!("{:.*}", precision.unwrap_or(6), value);
                if spec.plus && value >= 0.0 {
                    text.insert(0, '+');
                }
                text
            }
        }
    };
    pad_number_text(text, spec, width)
}

fn pad_number_text(text: String, spec: &ConvSpec, width: Option<i64>) -> String {
    let (left, width) = resolve_width(spec, width);
    if width <= text.len() {
        return text;
    }
    let pad = width - text.len();
    if spec.zero && !left {
        // Keep a leading sign ahead of the zeros
        if let Some(sign) = text.strip_prefix('-') {
            return format!("-{}{sign}", "0".repeat(pad));
        }
        if let Some(rest) = text.strip_prefix('+') {
            return format!("+{}{rest}", "0".repeat(pad));
        }
        format!("{}{text}", "0".repeat(pad))
    } else if left {
        format!("{text}{}", " ".repeat(pad))
    } else {
        format!("{}{text}", " ".repeat(pad))
    }
}

fn pad_text(text: String, spec: &ConvSpec, width: Option<i64>) -> String {
    let (left, width) = resolve_width(spec, width);
    if width <= text.chars().count() {
        return text;
    }
    let pad = width - text.chars().count();
    if left {
        format!("{text}{}", " ".repeat(pad))
    } else {
        format!("{}{text}", " ".repeat(pad))
    }
}

// A negative dynamic width means left justification in printf
fn resolve_width(spec: &ConvSpec, width: Option<i64>) -> (bool, usize) {
    match width {
        Some(value) if value < 0 => (true, value.unsigned_abs() as usize),
        Some(value) => (spec.left, value as usize),
        None => (spec.left, 0),
    }
}
