use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

use crate::app::AppContext;
use crate::error::{Result, SmxError};

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    /// The request was understood but the data breaks a rule.
    Invalid,
    /// A removal is waiting for the caller to confirm its cascade.
    CascadeRequired,
}

impl<T: Serialize> RobotResponse<T> {
    pub fn new(status: RobotStatus, data: T) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse::new(RobotStatus::Ok, data)
}

pub fn emit_robot<T: Serialize>(ctx: &AppContext, response: &RobotResponse<T>) -> Result<()> {
    emit_json(response, ctx.config.robot.pretty)
}

pub fn emit_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|err| SmxError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 14,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        // Pad before styling so escape codes do not eat the width.
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", style(padded).dim()));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn note(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).yellow().to_string());
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

/// `a, b, c`, or `(none)`.
#[must_use]
pub fn join_or_none<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_collects_lines_in_order() {
        console::set_colors_enabled(false);
        let mut layout = HumanLayout::new();
        layout.title("Stack web").kv("units", "2").bullet("react");
        let text = layout.build();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Stack web");
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("units"));
        assert!(lines[2].ends_with(" 2"));
        assert_eq!(lines[3], "- react");
    }

    #[test]
    fn join_or_none_marks_empty_lists() {
        assert_eq!(join_or_none(Vec::<String>::new()), "(none)");
        assert_eq!(join_or_none(["a", "b"]), "a, b");
    }

    #[test]
    fn robot_response_serializes_status_snake_case() {
        let response = RobotResponse::new(RobotStatus::CascadeRequired, 1);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "cascade_required");
        assert_eq!(value["data"], 1);
        assert!(value.get("warnings").is_none());
    }
}
