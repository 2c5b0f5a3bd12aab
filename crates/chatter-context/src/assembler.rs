use chatter_types::truncate_to_bytes;

use crate::context_input::ContextInput;

pub const DEFAULT_MAX_BYTES: usize = 768 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFamily {
    ClaudeCode,
    OpenAiCodex,
    GoogleGemini,
    Fallback,
}

impl AgentFamily {
    /// Resolve an `agentType` alias to its canonical family, per §4.3.4.
    /// Unknown aliases fall back to plain text and a warning.
    pub fn resolve(alias: &str) -> AgentFamily {
        match alias.to_ascii_lowercase().as_str() {
            "claude" | "claude-code" => AgentFamily::ClaudeCode,
            "codex" | "openai-codex" => AgentFamily::OpenAiCodex,
            "gemini" | "google-gemini" => AgentFamily::GoogleGemini,
            other => {
                tracing::warn!(agent_type = other, "unknown agent family, using fallback assembler");
                AgentFamily::Fallback
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub prompt: String,
    pub system_flag: Option<String>,
}

fn render_context_line(c: &crate::context_input::ContextCandidate) -> String {
    format!("{} -> {}: {}", c.from, c.to, c.content)
}

fn render_sibling_line(s: &crate::context_input::SiblingSummary) -> String {
    format!("{}: {}", s.speaker_label, s.content)
}

/// Greedily drop sibling entries (oldest-first, i.e. from the end of the
/// newest-first list) then context messages (oldest-first, from the
/// front) until `body` fits `max_bytes` once combined with
/// `fixed_suffix`. `fixed_suffix` (the current-message section) is never
/// touched except as an absolute last resort to satisfy the hard byte
/// budget invariant.
fn fit_body_within_budget(
    mut siblings: Vec<String>,
    mut context_lines: Vec<String>,
    header: &str,
    fixed_suffix: &str,
    max_bytes: usize,
) -> String {
    loop {
        let body = render_sections(header, &context_lines, &siblings);
        let total = body.len() + fixed_suffix.len();
        if total <= max_bytes {
            return format!("{body}{fixed_suffix}");
        }
        if !siblings.is_empty() {
            siblings.pop();
            continue;
        }
        if !context_lines.is_empty() {
            context_lines.remove(0);
            continue;
        }
        break;
    }
    let body = render_sections(header, &context_lines, &siblings);
    let remaining = max_bytes.saturating_sub(body.len());
    let suffix = truncate_to_bytes(fixed_suffix, remaining);
    let candidate = format!("{body}{suffix}");
    truncate_to_bytes(&candidate, max_bytes).to_string()
}

fn render_sections(header: &str, context_lines: &[String], siblings: &[String]) -> String {
    let mut out = String::new();
    out.push_str(header);
    for line in context_lines {
        out.push_str(line);
        out.push('\n');
    }
    for line in siblings {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Produce the final prompt text (and optional out-of-band system flag)
/// for `family` from `input`, respecting `max_bytes` (§4.3.4, §4.3.5).
pub fn assemble(family: AgentFamily, input: &ContextInput, max_bytes: usize) -> AssembledPrompt {
    let mut header = String::new();
    if let Some(task) = &input.team_task {
        header.push_str(&format!("Team task: {task}\n"));
    }
    if let Some(parent) = &input.parent_context {
        header.push_str(&format!("Parent: {parent}\n"));
    }

    let context_lines: Vec<String> = input.context_messages.iter().map(render_context_line).collect();
    let sibling_lines: Vec<String> = input.sibling_context.iter().map(render_sibling_line).collect();

    match family {
        AgentFamily::ClaudeCode => {
            let system = if header.is_empty() {
                String::new()
            } else {
                header.clone()
            };
            let fixed_suffix = format!("[MESSAGE]\n{}", input.current_message);
            let prompt = fit_body_within_budget(sibling_lines, context_lines, "", &fixed_suffix, max_bytes);
            AssembledPrompt {
                prompt,
                system_flag: if system.is_empty() { None } else { Some(system) },
            }
        }
        AgentFamily::OpenAiCodex => {
            let fixed_suffix = format!("[MESSAGE]\n{}", input.current_message);
            let sys_header = format!("[SYSTEM]\n{header}\n");
            let prompt =
                fit_body_within_budget(sibling_lines, context_lines, &sys_header, &fixed_suffix, max_bytes);
            AssembledPrompt {
                prompt,
                system_flag: None,
            }
        }
        AgentFamily::GoogleGemini => {
            let fixed_suffix = format!("Last message:\n{}", input.current_message);
            let instr_header = format!("Instructions:\n{header}\n");
            let prompt =
                fit_body_within_budget(sibling_lines, context_lines, &instr_header, &fixed_suffix, max_bytes);
            AssembledPrompt {
                prompt,
                system_flag: None,
            }
        }
        AgentFamily::Fallback => {
            let prompt = truncate_to_bytes(&input.current_message, max_bytes).to_string();
            AssembledPrompt {
                prompt,
                system_flag: None,
            }
        }
    }
}
