use chatter_types::{Intent, ParsedAddressee};
use once_cell::sync::Lazy;
use regex::Regex;

static NEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[NEXT:\s*([^\]]*)\]").unwrap());
static DROP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[DROP:\s*([^\]]*)\]").unwrap());
static FROM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[FROM:\s*([^\]]*)\]").unwrap());
static TEAM_TASK_INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[TEAM_TASK:\s*([^\]]*)\]").unwrap());
static TEAM_TASK_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\[TEAM_TASK\]\s*\n(.*?)\n[ \t]*\n\[NEXT_SECTION\]").unwrap()
});

/// What a `[DROP:...]` marker asks the routing queue to do. `All`
/// supersedes any named targets found in the same message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropDirective {
    None,
    All,
    Named(Vec<String>),
}

/// Everything extracted from one raw message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarkers {
    pub clean_content: String,
    pub raw_next_markers: Vec<String>,
    pub parsed_addressees: Vec<ParsedAddressee>,
    pub drop: DropDirective,
    pub from_member: Option<String>,
    pub team_task: Option<String>,
}

/// Split a `[NEXT: ...]` body into individual addressee entries, applying
/// the optional `!P1`/`!P2`/`!P3` suffix rule. An unrecognized suffix is
/// treated as part of the addressee name rather than being stripped.
fn parse_next_body(body: &str) -> Vec<ParsedAddressee> {
    body.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            if let Some(bang) = entry.rfind('!') {
                let (name, suffix) = (&entry[..bang], &entry[bang + 1..]);
                if let Some(intent) = Intent::from_suffix(suffix) {
                    return ParsedAddressee {
                        raw: name.trim().to_string(),
                        intent,
                    };
                }
            }
            ParsedAddressee {
                raw: entry.to_string(),
                intent: Intent::default(),
            }
        })
        .collect()
}

fn parse_drop_body(body: &str) -> DropDirective {
    let trimmed = body.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return DropDirective::All;
    }
    let names: Vec<String> = trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        DropDirective::None
    } else {
        DropDirective::Named(names)
    }
}

/// Collapse runs of intra-line spaces to one and drop empty lines, while
/// preserving the newlines that separate non-empty lines.
fn clean_whitespace(s: &str) -> String {
    let space_run = Regex::new(r"[ \t]+").unwrap();
    s.lines()
        .map(|line| space_run.replace_all(line.trim(), " ").to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract `[NEXT:...]`, `[DROP:...]`, `[FROM:...]`, and `[TEAM_TASK...]`
/// markers from `content`. `clean_content` has NEXT/DROP/TEAM_TASK
/// removed; `[FROM:...]` is left in place for audit (it is only removed
/// by [`strip_all_markers_for_context`]).
pub fn parse_markers(content: &str) -> ParsedMarkers {
    let mut working = content.to_string();

    let raw_next_markers: Vec<String> = NEXT_RE
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect();
    let parsed_addressees: Vec<ParsedAddressee> = NEXT_RE
        .captures_iter(content)
        .flat_map(|c| parse_next_body(&c[1]))
        .collect();
    working = NEXT_RE.replace_all(&working, "").to_string();

    let drop = DROP_RE
        .captures(content)
        .map(|c| parse_drop_body(&c[1]))
        .unwrap_or(DropDirective::None);
    working = DROP_RE.replace_all(&working, "").to_string();

    let from_member = FROM_RE.captures(content).map(|c| c[1].trim().to_string());

    // TEAM_TASK: last occurrence (by start offset) of either syntax wins;
    // every occurrence of either syntax is stripped from clean_content.
    let mut team_task_matches: Vec<(usize, String)> = Vec::new();
    for c in TEAM_TASK_INLINE_RE.captures_iter(content) {
        let m = c.get(0).unwrap();
        team_task_matches.push((m.start(), c[1].trim().to_string()));
    }
    for c in TEAM_TASK_BLOCK_RE.captures_iter(content) {
        let m = c.get(0).unwrap();
        team_task_matches.push((m.start(), c[1].trim().to_string()));
    }
    team_task_matches.sort_by_key(|(start, _)| *start);
    let team_task = team_task_matches.last().map(|(_, v)| v.clone());

    working = TEAM_TASK_BLOCK_RE.replace_all(&working, "").to_string();
    working = TEAM_TASK_INLINE_RE.replace_all(&working, "").to_string();

    ParsedMarkers {
        clean_content: clean_whitespace(&working),
        raw_next_markers,
        parsed_addressees,
        drop,
        from_member,
        team_task,
    }
}

/// Second, more aggressive pass used by the context manager: strips every
/// marker kind, including `[FROM:...]` and `[TEAM_TASK...]`, which
/// `parse_markers`'s `clean_content` preserves for audit.
pub fn strip_all_markers_for_context(content: &str) -> String {
    let mut working = content.to_string();
    working = TEAM_TASK_BLOCK_RE.replace_all(&working, "").to_string();
    working = TEAM_TASK_INLINE_RE.replace_all(&working, "").to_string();
    working = NEXT_RE.replace_all(&working, "").to_string();
    working = DROP_RE.replace_all(&working, "").to_string();
    working = FROM_RE.replace_all(&working, "").to_string();
    clean_whitespace(&working)
}
