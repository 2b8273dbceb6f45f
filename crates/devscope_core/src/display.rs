//! Text forms of serialized values for copy buttons, graph value bubbles and
//! function summaries.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::value::{FunctionRef, SerializedValue};

/// Bubble text longer than this is truncated.
pub const MAX_VALUE_CHARS: usize = 42;
/// Characters kept when truncating, before the ellipsis.
pub const TRUNCATED_VALUE_CHARS: usize = 40;

/// Text placed on the clipboard for a value.
///
/// Functions copy their source, containers copy as pretty-printed JSON
/// (two-space indent), everything else copies its display string.
pub fn format_value_for_copy(value: &SerializedValue) -> String {
    match value {
        SerializedValue::Function(func) => func.source().to_string(),
        SerializedValue::Array(_) | SerializedValue::Object(_) => match pretty_json(value) {
            Ok(text) => text,
            Err(err) => {
                debug!(%err, "copy fell back to display string");
                display_string(value)
            }
        },
        _ => display_string(value),
    }
}

fn pretty_json(value: &SerializedValue) -> Result<String> {
    serde_json::to_string_pretty(&value.to_json()).map_err(|e| Error::SerializationFailure(e.to_string()))
}

/// Plain string conversion: strings unquoted, numbers in shortest form,
/// arrays comma-joined, objects as `[object Object]`.
pub fn display_string(value: &SerializedValue) -> String {
    match value {
        SerializedValue::Null => "null".to_string(),
        SerializedValue::Bool(b) => b.to_string(),
        SerializedValue::Number(n) => format_number(*n),
        SerializedValue::String(s) => s.clone(),
        SerializedValue::Function(func) => func.source().to_string(),
        SerializedValue::Array(items) => items
            .iter()
            .map(|item| match item {
                SerializedValue::Null => String::new(),
                other => display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        SerializedValue::Object(_) => "[object Object]".to_string(),
    }
}

/// Shortest round-tripping text for a number.
///
/// Magnitudes outside `[1e-6, 1e21)` use exponent form with an explicit
/// sign on positive exponents (`1e+21`, `1.5e-7`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&n.abs()) {
        return format!("{n}");
    }
    let text = format!("{n:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

/// Text for a graph leaf's value bubble.
///
/// `None` is an unresolved path and reads as `undefined`. Strings are shown
/// raw, functions as a signature, containers as compact JSON.
pub fn leaf_value_string(value: Option<&SerializedValue>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(SerializedValue::Null) => "null".to_string(),
        Some(SerializedValue::String(s)) => s.clone(),
        Some(SerializedValue::Function(func)) => function_signature(func),
        Some(other) => match serde_json::to_string(&other.to_json()) {
            Ok(text) => text,
            Err(err) => {
                debug!(%err, "leaf value fell back to display string");
                display_string(other)
            }
        },
    }
}

/// Truncate `text` to [`TRUNCATED_VALUE_CHARS`] plus an ellipsis when it is
/// longer than [`MAX_VALUE_CHARS`].
pub fn truncate_value(text: &str) -> String {
    if text.chars().count() > MAX_VALUE_CHARS {
        let mut out: String = text.chars().take(TRUNCATED_VALUE_CHARS).collect();
        out.push('…');
        out
    } else {
        text.to_string()
    }
}

fn declaration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^function\s*([\w$]*)\s*\(([^)]*)\)").ok())
        .as_ref()
}

fn arrow_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\(([^)]*)\)\s*=>").ok())
        .as_ref()
}

fn whitespace_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").ok()).as_ref()
}

/// One-line signature such as `ƒ increment(by)`.
///
/// Parses `function name(params)` declarations and `(params) =>` arrows;
/// anything else is described by its arity as `arg1, arg2, ...`.
pub fn function_signature(func: &FunctionRef) -> String {
    let name = func.display_name();
    let normalized = match whitespace_pattern() {
        Some(ws) => ws.replace_all(func.source(), " ").into_owned(),
        None => func.source().to_string(),
    };

    if let Some(caps) = declaration_pattern().and_then(|re| re.captures(&normalized)) {
        let declared = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let params = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        let shown = if declared.is_empty() { name } else { declared };
        return format!("ƒ {shown}({params})");
    }

    if let Some(caps) = arrow_pattern().and_then(|re| re.captures(&normalized)) {
        let params = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        return format!("ƒ {name}({params})");
    }

    let params = (1..=func.arity())
        .map(|i| format!("arg{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("ƒ {name}({params})")
}
