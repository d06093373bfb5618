//! Formatted output helpers for CLI commands.

use sanders_common::types::RemovalPolicy;
use serde_json::Value;

/// A horizontal rule `width` characters wide.
#[must_use]
pub fn rule(width: usize) -> String {
    "\u{2550}".repeat(width)
}

/// Retention column of the plan table.
#[must_use]
pub const fn format_removal(removal: Option<RemovalPolicy>) -> &'static str {
    match removal {
        Some(RemovalPolicy::Retain) => "retain",
        Some(RemovalPolicy::Destroy) => "destroy",
        None => "-",
    }
}

/// Short human form of an output value: literals verbatim, intrinsics as
/// `Ref(Id)` or `GetAtt(Id.Attr)`.
#[must_use]
pub fn format_value(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_owned();
    }
    if let Some(id) = value.get("Ref").and_then(Value::as_str) {
        return format!("Ref({id})");
    }
    if let Some(parts) = value.get("Fn::GetAtt").and_then(Value::as_array) {
        let segments: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
        return format!("GetAtt({})", segments.join("."));
    }
    value.to_string()
}

/// Pads `text` on the right to `width` characters.
#[must_use]
pub fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}
