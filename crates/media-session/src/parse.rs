//! Parsers for `dbus-send --print-reply` output
//!
//! dbus-send prints one value per line with a type prefix, e.g.
//! `variant       double 0.8` or `string "org.mpris.MediaPlayer2.spotify"`.

use std::collections::HashMap;
use std::fmt;

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

/// A scalar carried in a D-Bus variant
#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    Str(String),
    Number(f64),
    Bool(bool),
}

impl VariantValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VariantValue::Number(n) => Some(*n),
            VariantValue::Str(s) => s.parse().ok(),
            VariantValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariantValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantValue::Str(s) => f.write_str(s),
            VariantValue::Number(n) => write!(f, "{}", n),
            VariantValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Text between the first and the last double quote
fn quoted(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line.rfind('"')?;
    (end > start).then(|| line[start + 1..end].to_string())
}

/// Parse a `<type> <value>` pair such as `int64 1234` or `string "x"`
fn parse_typed_value(text: &str) -> Option<VariantValue> {
    let (kind, rest) = text.trim().split_once(char::is_whitespace)?;
    let rest = rest.trim();

    match kind {
        "string" => quoted(rest).map(VariantValue::Str),
        "object" => quoted(rest).map(VariantValue::Str),
        "double" | "int16" | "uint16" | "int32" | "uint32" | "int64" | "uint64" | "byte" => {
            rest.parse::<f64>().ok().map(VariantValue::Number)
        }
        "boolean" => Some(VariantValue::Bool(rest == "true")),
        _ => None,
    }
}

/// Parse a line like `variant       uint64 240000000`
pub fn parse_variant_line(line: &str) -> Option<VariantValue> {
    parse_typed_value(line.trim().strip_prefix("variant")?)
}

/// Value of a `Properties.Get` reply
pub fn parse_property(output: &str) -> Option<VariantValue> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("variant"))
        .and_then(parse_variant_line)
}

/// MPRIS bus names from a `ListNames` reply
pub fn parse_player_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains(MPRIS_PREFIX))
        .filter_map(quoted)
        .collect()
}

/// Flatten the `Metadata` dictionary into strings
///
/// Array values (artists) keep their first element; numbers (`mpris:length`)
/// are rendered as plain numbers.
pub fn parse_metadata(output: &str) -> HashMap<String, String> {
    let lines: Vec<&str> = output.lines().map(str::trim).collect();
    let mut metadata = HashMap::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.starts_with("dict entry(") {
            continue;
        }

        let Some(key) = lines.get(i + 1).filter(|l| l.starts_with("string")).and_then(|l| quoted(l)) else {
            continue;
        };
        let Some(value_line) = lines.get(i + 2) else {
            continue;
        };

        let value = if value_line.ends_with("array [") {
            lines
                .iter()
                .skip(i + 3)
                .take_while(|l| !l.starts_with(']'))
                .find_map(|l| parse_typed_value(l))
                .map(|v| v.to_string())
        } else {
            parse_variant_line(value_line).map(|v| v.to_string())
        };

        if let Some(value) = value {
            tracing::debug!("Parsed metadata {} = {}", key, value);
            metadata.insert(key, value);
        }
    }

    metadata
}
