use std::sync::OnceLock;

use regex::Regex;

use crate::core::types::NarrationFragment;

/// Order assigned to fragments without a usable `data-fragment-index`.
pub const UNORDERED: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub text: String,
    pub order: u32,
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Quoted values may hold `<` and `>`. A value is only accepted when its
        // closing quote is followed by whitespace, `/` or the end of the tag.
        Regex::new(concat!(
            r#"(?is)<[a-z](?:[^<>"']|"[^"]*"|'[^']*')*?"#,
            r#"\bdata-tts\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
            r#"(?:[\s/](?:[^<>"']|"[^"]*"|'[^']*')*)?>"#,
        ))
        .expect("narration tag pattern")
    })
}

fn order_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\bdata-fragment-index\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
            .expect("fragment index pattern")
    })
}

fn markup_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("markup tag pattern"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"))
}

/// Narration scripts of one slide, in playback order.
///
/// Tags carrying `data-tts` are collected in document order and stable-sorted
/// by `data-fragment-index`; tags without a parseable index go last, keeping
/// their relative order. Tags whose `data-tts` value is unterminated or empty
/// are skipped.
pub fn extract_scripts(markup: &str) -> Vec<ScriptEntry> {
    let mut entries: Vec<ScriptEntry> = tag_pattern()
        .captures_iter(markup)
        .filter_map(|caps| {
            let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
            let text = decode_entities(raw.trim());
            if text.is_empty() {
                return None;
            }
            let tag = caps.get(0)?.as_str();
            Some(ScriptEntry {
                text,
                order: parse_order(tag),
            })
        })
        .collect();
    // `sort_by_key` is stable.
    entries.sort_by_key(|entry| entry.order);
    entries
}

/// Fragments of slide `slide_index`; `element_index` is the playback position.
pub fn fragments_for_slide(slide_index: u32, markup: &str) -> Vec<NarrationFragment> {
    extract_scripts(markup)
        .into_iter()
        .enumerate()
        .map(|(position, entry)| NarrationFragment {
            slide_index,
            element_index: position as u32,
            text: entry.text,
            order: entry.order,
        })
        .collect()
}

/// Visible text of a slide with tags removed and whitespace collapsed.
pub fn slide_plain_text(markup: &str) -> String {
    let stripped = markup_tag_pattern().replace_all(markup, " ");
    let decoded = decode_entities(&stripped);
    whitespace_pattern()
        .replace_all(&decoded, " ")
        .trim()
        .to_string()
}

fn parse_order(tag: &str) -> u32 {
    order_pattern()
        .captures(tag)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .and_then(|raw| raw.as_str().trim().parse::<u32>().ok())
        .filter(|order| *order != UNORDERED)
        .unwrap_or(UNORDERED)
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
