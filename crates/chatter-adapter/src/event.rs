use serde::Deserialize;

/// How a turn ended, per §4.5.1 / §6.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Done,
    Error,
    Cancelled,
    Timeout,
}

/// One normalized event parsed from a CLI's JSONL stdout (§6.2, §6.3).
/// The raw schema of each CLI is external; this is the set the core
/// itself depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Text {
        category: Option<String>,
        text: String,
    },
    TurnCompleted {
        finish_reason: FinishReason,
    },
    Error {
        code: String,
        message: String,
    },
    Reasoning {
        text: String,
    },
    System {
        message: String,
    },
}

/// Shape of one JSONL line on a CLI's stdout, before normalization.
/// Concrete CLIs vary in their raw schema (external, per §6.3); this is
/// the common shape the adapter's parser accepts.
#[derive(Debug, Deserialize)]
pub(crate) struct RawLine {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

pub(crate) fn parse_jsonl_line(line: &str) -> Option<AgentEvent> {
    let raw: RawLine = serde_json::from_str(line).ok()?;
    match raw.kind.as_str() {
        "text" | "message" => Some(AgentEvent::Text {
            category: raw.category,
            text: raw.text.unwrap_or_default(),
        }),
        "turn.completed" => {
            let finish_reason = match raw.finish_reason.as_deref() {
                Some("error") => FinishReason::Error,
                Some("cancelled") => FinishReason::Cancelled,
                Some("timeout") => FinishReason::Timeout,
                _ => FinishReason::Done,
            };
            Some(AgentEvent::TurnCompleted { finish_reason })
        }
        "error" => Some(AgentEvent::Error {
            code: raw.code.unwrap_or_else(|| "unknown".to_string()),
            message: raw.message.unwrap_or_default(),
        }),
        "reasoning" => Some(AgentEvent::Reasoning {
            text: raw.text.unwrap_or_default(),
        }),
        "system" => Some(AgentEvent::System {
            message: raw.message.unwrap_or_default(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_event() {
        let e = parse_jsonl_line(r#"{"type":"text","category":"result","text":"done"}"#).unwrap();
        assert_eq!(
            e,
            AgentEvent::Text {
                category: Some("result".into()),
                text: "done".into()
            }
        );
    }

    #[test]
    fn parses_turn_completed_default_done() {
        let e = parse_jsonl_line(r#"{"type":"turn.completed"}"#).unwrap();
        assert_eq!(
            e,
            AgentEvent::TurnCompleted {
                finish_reason: FinishReason::Done
            }
        );
    }

    #[test]
    fn unknown_line_type_is_ignored() {
        assert!(parse_jsonl_line(r#"{"type":"debug","text":"noise"}"#).is_none());
    }

    #[test]
    fn malformed_json_is_ignored() {
        assert!(parse_jsonl_line("not json").is_none());
    }
}
