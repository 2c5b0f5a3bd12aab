use chatter_markers::strip_all_markers_for_context;
use chatter_types::{Intent, MemberType, RoutingItem};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::log::MessageLog;

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_MAX_SIBLINGS: usize = 20;
pub const DEFAULT_SIBLING_CONTENT_MAX_LENGTH: usize = 280;

static FENCED_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());

/// One prior message rendered into context, per §4.3.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCandidate {
    pub from: String,
    pub to: String,
    pub content: String,
    pub message_id: String,
}

/// A sibling reply summarized for route-based context (§4.3.3 step 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingSummary {
    pub speaker_label: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub parent_message_id: String,
    pub intent: Intent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextMeta {
    pub truncated_siblings: bool,
    pub sibling_count: usize,
}

/// Caller-supplied knobs for context assembly.
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub window: Option<usize>,
    pub force_parent_reinsertion: bool,
    pub max_siblings: usize,
    pub sibling_content_max_length: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            window: None,
            force_parent_reinsertion: false,
            max_siblings: DEFAULT_MAX_SIBLINGS,
            sibling_content_max_length: DEFAULT_SIBLING_CONTENT_MAX_LENGTH,
        }
    }
}

/// Everything needed by a prompt assembler to produce the final text for
/// one turn (§4.3.3 step 7).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextInput {
    pub context_messages: Vec<ContextCandidate>,
    pub current_message: String,
    pub team_task: Option<String>,
    pub parent_context: Option<String>,
    pub sibling_context: Vec<SiblingSummary>,
    pub route_meta: Option<RouteMeta>,
    pub meta: ContextMeta,
}

fn resolved_to_label(msg: &chatter_types::ConversationMessage) -> String {
    match &msg.routing {
        Some(r) if !r.resolved_addressees.is_empty() => r.resolved_addressees.join(", "),
        _ => "all".to_string(),
    }
}

/// §4.3.2 — context for an agent with no specific scheduled route.
pub fn get_context_for_agent(
    log: &MessageLog,
    team_task: Option<String>,
    opts: ContextOptions,
) -> Option<ContextInput> {
    let latest = log.latest()?;
    let window = opts.window.unwrap_or(DEFAULT_WINDOW);

    let all_but_last = &log.messages()[..log.messages().len() - 1];
    let start = all_but_last.len().saturating_sub(window);
    let mut context_messages: Vec<ContextCandidate> = all_but_last[start..]
        .iter()
        .map(|m| ContextCandidate {
            from: m.speaker.name.clone(),
            to: resolved_to_label(m),
            content: strip_all_markers_for_context(&m.content),
            message_id: m.id.clone(),
        })
        .collect();

    let current_message = strip_all_markers_for_context(&latest.content);

    if latest.speaker.member_type == MemberType::Ai {
        if let Some(last) = context_messages.last() {
            if last.message_id == latest.id {
                context_messages.pop();
            } else if last.from == latest.speaker.name && last.content == current_message {
                context_messages.pop();
            }
        }
    }

    Some(ContextInput {
        context_messages,
        current_message,
        team_task,
        parent_context: None,
        sibling_context: Vec::new(),
        route_meta: None,
        meta: ContextMeta::default(),
    })
}

fn summarize_sibling(msg: &chatter_types::ConversationMessage, max_len: usize) -> SiblingSummary {
    let stripped = strip_all_markers_for_context(&msg.content);
    let no_code = FENCED_CODE_RE.replace_all(&stripped, "[code block omitted]");
    let truncated: String = if no_code.chars().count() > max_len {
        let prefix: String = no_code.chars().take(max_len).collect();
        format!("{prefix}…")
    } else {
        no_code.to_string()
    };
    let intent_label = msg
        .routing
        .as_ref()
        .and_then(|r| r.intent)
        .map(|i| format!("{i:?}"))
        .unwrap_or_else(|| "P2Reply".to_string());
    SiblingSummary {
        speaker_label: format!("{} [{}]", msg.speaker.name, intent_label),
        content: truncated,
    }
}

/// §4.3.3 — context for a specific scheduled routing item.
pub fn get_context_for_route(
    log: &MessageLog,
    route: &RoutingItem,
    team_task: Option<String>,
    opts: ContextOptions,
) -> ContextInput {
    let parent_index = match log.index_of(&route.parent_message_id) {
        Some(i) => i,
        None => {
            let mut fallback =
                get_context_for_agent(log, team_task, opts).unwrap_or_default();
            fallback.meta = ContextMeta {
                truncated_siblings: false,
                sibling_count: 0,
            };
            return fallback;
        }
    };

    let window = opts.window.unwrap_or(DEFAULT_WINDOW);
    let win_start = parent_index.saturating_sub(window);
    let mut context_messages: Vec<ContextCandidate> = log.messages()[win_start..parent_index]
        .iter()
        .map(|m| ContextCandidate {
            from: m.speaker.name.clone(),
            to: resolved_to_label(m),
            content: strip_all_markers_for_context(&m.content),
            message_id: m.id.clone(),
        })
        .collect();

    let parent = &log.messages()[parent_index];

    // The window is defined as [win_start, parent_index), which by
    // construction never includes the parent itself; reinsertion is
    // therefore driven solely by the flag. This also covers the case
    // where the parent would otherwise have been pruned by byte-budget
    // truncation further downstream (see DESIGN.md open question 3).
    let parent_context = if opts.force_parent_reinsertion {
        Some(strip_all_markers_for_context(&parent.content))
    } else {
        None
    };

    let mut siblings: Vec<&chatter_types::ConversationMessage> = log
        .messages()
        .iter()
        .filter(|m| {
            m.routing
                .as_ref()
                .and_then(|r| r.parent_message_id.as_deref())
                == Some(route.parent_message_id.as_str())
        })
        .collect();
    siblings.sort_by(|a, b| b.id.cmp(&a.id));
    let total_siblings = siblings.len();
    let truncated_siblings = total_siblings > opts.max_siblings;
    siblings.truncate(opts.max_siblings);
    let sibling_context: Vec<SiblingSummary> = siblings
        .iter()
        .map(|m| summarize_sibling(m, opts.sibling_content_max_length))
        .collect();

    // Dedup: drop the parent itself from the context list, and drop the
    // target member's most recent message within the window.
    context_messages.retain(|c| c.message_id != parent.id);
    if let Some(pos) = context_messages
        .iter()
        .rposition(|c| log.get(&c.message_id).map(|m| m.speaker.id.as_str()) == Some(route.target_member_id.as_str()))
    {
        context_messages.remove(pos);
    }

    let current_message = strip_all_markers_for_context(&parent.content);

    ContextInput {
        context_messages,
        current_message,
        team_task,
        parent_context,
        sibling_context,
        route_meta: Some(RouteMeta {
            parent_message_id: route.parent_message_id.clone(),
            intent: route.intent,
        }),
        meta: ContextMeta {
            truncated_siblings,
            sibling_count: total_siblings,
        },
    }
}
