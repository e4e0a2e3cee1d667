use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One historical song available as drafting inspiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    pub text: String,
}

impl ReferenceEntry {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A corpus entry with its similarity to the query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReference {
    pub entry: ReferenceEntry,
    pub similarity: f32,
}

/// Corpus row as loaded from the source dataset, before cleanup.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLyricRecord {
    pub name: String,
    pub lyrics: String,
}

fn index_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("valid regex"))
}

/// Strip dataset artifacts from a lyric body.
///
/// The source dataset stores lyrics as stringified Python lists
/// (`['line one', 'line two']`), interleaves bare index numbers, and
/// prefixes many songs with a `Lyrics` heading. Returns `None` when nothing
/// but artifacts remain.
pub fn clean_lyric_text(raw: &str) -> Option<String> {
    let mut body = raw.trim();

    if body.starts_with('[') && body.ends_with(']') && looks_like_list_literal(&body[1..body.len() - 1]) {
        body = &body[1..body.len() - 1];
    }

    let unwrapped: Vec<String> = if looks_like_list_literal(body) {
        split_list_literal(body)
    } else {
        body.lines().map(str::to_string).collect()
    };

    let lines: Vec<&str> = unwrapped
        .iter()
        .map(|l| l.trim())
        .filter(|l| !index_line().is_match(l))
        .filter(|l| !l.eq_ignore_ascii_case("lyrics"))
        .collect();

    let text = collapse_blank_runs(&lines);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn looks_like_list_literal(body: &str) -> bool {
    let b = body.trim();
    let is_quote = |c: char| c == '\'' || c == '"';
    b.len() >= 2 && b.starts_with(is_quote) && b.ends_with(is_quote)
}

/// Split `'a', "b", 'c'` into its items, honouring both quote styles.
fn split_list_literal(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in body.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    current.push(match c {
                        'n' => '\n',
                        other => other,
                    });
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    items.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
            }
        }
    }
    if !current.is_empty() {
        items.push(current);
    }

    items
        .into_iter()
        .flat_map(|item| item.lines().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

fn collapse_blank_runs(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_empty() && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
