use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideMarkup {
    pub index: u32,
    pub name: Option<String>,
    pub html: String,
}

fn style_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style block pattern"))
}

/// Slides of an editor project, one per entry of `project.pages`.
///
/// A page's markup is its `component` string when present, otherwise the
/// first frame's component (string or component tree). Style blocks are
/// dropped.
pub fn extract_slides(project: &Value) -> Vec<SlideMarkup> {
    let Some(pages) = project.get("pages").and_then(Value::as_array) else {
        return vec![];
    };

    pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let raw = page_markup(page);
            SlideMarkup {
                index: index as u32,
                name: page.get("name").and_then(Value::as_str).map(ToString::to_string),
                html: style_block_pattern().replace_all(&raw, "").trim().to_string(),
            }
        })
        .collect()
}

fn page_markup(page: &Value) -> String {
    if let Some(component) = page.get("component").and_then(Value::as_str) {
        return component.to_string();
    }
    let frame_component = page
        .get("frames")
        .and_then(Value::as_array)
        .and_then(|frames| frames.first())
        .and_then(|frame| frame.get("component"));
    match frame_component {
        Some(Value::String(html)) => html.clone(),
        Some(tree @ Value::Object(_)) => component_to_html(tree),
        _ => String::new(),
    }
}

/// Renders a component tree (`tagName`/`type`, `attributes`, `classes`,
/// `components`, `textnode` content) to HTML.
pub fn component_to_html(node: &Value) -> String {
    let Some(object) = node.as_object() else {
        return String::new();
    };
    if object.get("type").and_then(Value::as_str) == Some("textnode") {
        return escape_html(object.get("content").and_then(Value::as_str).unwrap_or(""));
    }

    let tag = tag_for(node);
    let mut attrs = String::new();
    if let Some(attributes) = object.get("attributes").and_then(Value::as_object) {
        for (key, value) in attributes {
            if key == "class" || key == "className" {
                continue;
            }
            let rendered = match value {
                Value::Null => continue,
                Value::String(s) if s.is_empty() => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            attrs.push_str(&format!(" {key}=\"{}\"", escape_html(&rendered)));
        }
    }
    let classes: Vec<&str> = object
        .get("classes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|class| {
                    class
                        .as_str()
                        .or_else(|| class.get("name").and_then(Value::as_str))
                })
                .filter(|class| !class.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if !classes.is_empty() {
        attrs.push_str(&format!(" class=\"{}\"", escape_html(&classes.join(" "))));
    }

    let inner: String = object
        .get("components")
        .and_then(Value::as_array)
        .map(|children| children.iter().map(component_to_html).collect())
        .unwrap_or_default();

    format!("<{tag}{attrs}>{inner}</{tag}>")
}

fn tag_for(node: &Value) -> String {
    if let Some(tag) = node.get("tagName").and_then(Value::as_str) {
        return tag.to_string();
    }
    match node.get("type").and_then(Value::as_str) {
        Some("heading") => "h1".to_string(),
        Some("text") => "p".to_string(),
        _ => "div".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::narration::extract::extract_scripts;

    #[test]
    fn string_components_become_slides() {
        let project = json!({
            "pages": [
                {"name": "Intro", "component": "<div><h1 data-tts=\"Welcome\">Hi</h1></div><style>body{}</style>"},
                {"name": "Empty", "component": ""}
            ]
        });
        let slides = extract_slides(&project);
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].name.as_deref(), Some("Intro"));
        assert_eq!(slides[0].html, "<div><h1 data-tts=\"Welcome\">Hi</h1></div>");
        assert_eq!(slides[1].index, 1);
        assert!(slides[1].html.is_empty());
    }

    #[test]
    fn component_tree_is_rendered() {
        let project = json!({
            "pages": [{
                "frames": [{
                    "component": {
                        "type": "wrapper",
                        "components": [
                            {
                                "type": "heading",
                                "attributes": {"data-tts": "Say \"cheese\"", "data-fragment-index": 1},
                                "classes": ["title", {"name": "big"}],
                                "components": [{"type": "textnode", "content": "Tom & Jerry"}]
                            },
                            {"type": "text", "attributes": {"data-tts": "first", "data-fragment-index": "0"}}
                        ]
                    }
                }]
            }]
        });
        let slides = extract_slides(&project);
        assert_eq!(slides.len(), 1);
        let html = &slides[0].html;
        assert!(html.starts_with("<div><h1 "));
        assert!(html.contains("class=\"title big\""));
        assert!(html.contains("Tom &amp; Jerry"));

        let scripts = extract_scripts(html);
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].text, "first");
        assert_eq!(scripts[1].text, "Say \"cheese\"");
    }

    #[test]
    fn missing_pages_yield_no_slides() {
        assert!(extract_slides(&json!({})).is_empty());
        assert!(extract_slides(&json!({"pages": "nope"})).is_empty());
    }
}
