//! Markdown export of a highlighted page.
//!
//! `html_to_markdown` is a small, deterministic converter covering the
//! elements readable content is made of; `export_document` assembles the
//! full export with the highlight list and the extracted page content.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Document, NodeData, NodeId};
use crate::types::highlight::{HighlightGroup, DEFAULT_GROUP};

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static pattern is valid"));

/// Elements whose converted content is trimmed before formatting.
const TRIMMED_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote",
];

/// Elements whose content never reaches the export.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

const UNTITLED: &str = "Untitled Page";

/// One marker's text, as listed in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedHighlight {
    pub group: String,
    pub text: String,
}

/// Everything `export_document` needs from a page session.
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub exported_at: DateTime<Utc>,
    /// Markers in list order.
    pub highlights: &'a [ExportedHighlight],
    pub groups: &'a [HighlightGroup],
    pub multi_color: bool,
    /// Cleaned HTML of the page's main content.
    pub content_html: &'a str,
}

/// Converts an HTML fragment to Markdown.
///
/// Three or more consecutive newlines collapse to one blank line and the
/// result is trimmed.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let (doc, container) = Document::parse_fragment(html);
    let converted = convert_node(&doc, container);
    EXCESS_NEWLINES
        .replace_all(&converted, "\n\n")
        .trim()
        .to_string()
}

fn convert_node(doc: &Document, node: NodeId) -> String {
    let element = match doc.data(node) {
        NodeData::Text(text) => return text.clone(),
        NodeData::Element(element) => element,
        _ => return String::new(),
    };
    let tag = element.name.as_str();
    if SKIPPED_TAGS.contains(&tag) {
        return String::new();
    }

    let mut content: String = doc
        .children(node)
        .iter()
        .map(|child| convert_node(doc, *child))
        .collect();
    if TRIMMED_TAGS.contains(&tag) {
        content = content.trim().to_string();
    }

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            format!("\n{} {}\n\n", "#".repeat(level), content)
        }
        "p" => format!("\n{}\n\n", content),
        "br" => "  \n".to_string(),
        "b" | "strong" => format!("**{}**", content),
        "i" | "em" => format!("*{}*", content),
        "code" => format!("`{}`", content),
        "pre" => format!("\n```\n{}\n```\n\n", content),
        "a" => match element.attr("href") {
            Some(href) if !href.is_empty() => format!("[{}]({})", content, href),
            _ => content,
        },
        "img" => {
            let src = element
                .attr("src")
                .filter(|s| !s.is_empty())
                .or_else(|| element.attr("data-src"))
                .unwrap_or("");
            if src.is_empty() {
                String::new()
            } else {
                format!("\n![{}]({})\n", element.attr("alt").unwrap_or(""), src)
            }
        }
        "ul" | "ol" => format!("\n{}\n", content),
        "li" => format!("- {}\n", content),
        "blockquote" => format!("\n> {}\n\n", content),
        "figure" => format!("\n{}\n", content),
        "figcaption" => format!("\n_{}_\n\n", content),
        _ => content,
    }
}

/// Builds the full Markdown export for a page.
pub fn export_document(request: &ExportRequest<'_>) -> String {
    let title = if request.title.trim().is_empty() {
        UNTITLED
    } else {
        request.title
    };

    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title));
    out.push_str(&format!("**Source:** [{0}]({0})\n", request.url));
    out.push_str(&format!(
        "**Exported:** {}\n",
        request
            .exported_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out.push_str(&format!(
        "**Total Highlights:** {}\n\n",
        request.highlights.len()
    ));
    out.push_str("---\n\n");

    if request.multi_color && !request.groups.is_empty() {
        write_grouped(&mut out, request);
    } else {
        out.push_str("## Highlights\n\n");
        write_numbered(&mut out, request.highlights.iter());
        out.push_str("\n---\n\n");
    }

    out.push_str("## Full Page Content\n\n");
    out.push_str(&html_to_markdown(request.content_html));
    out.push_str("\n\n---\n\n");
    out.push_str("*Exported by pagemark*\n");
    out
}

fn write_grouped(out: &mut String, request: &ExportRequest<'_>) {
    let mut group_ids: Vec<&str> = Vec::new();
    for highlight in request.highlights {
        if !group_ids.contains(&highlight.group.as_str()) {
            group_ids.push(highlight.group.as_str());
        }
    }

    let mut ordinal = 1;
    for group_id in group_ids {
        let members = request.highlights.iter().filter(|h| h.group == group_id);
        if group_id == DEFAULT_GROUP {
            out.push_str("## Highlights\n\n");
        } else {
            let color = request
                .groups
                .iter()
                .find(|g| g.term == group_id)
                .map(|g| g.color.as_str());
            let matches = members.clone().count();
            out.push_str(&format!(
                "## Highlight Group {}: \"{}\"\n\n",
                ordinal, group_id
            ));
            // highlights can outlive their group's color entry
            if let Some(color) = color {
                out.push_str(&format!("**Color:** {}\n", color));
            }
            out.push_str(&format!("**Matches:** {}\n\n", matches));
            ordinal += 1;
        }
        write_numbered(out, members);
        out.push_str("\n---\n\n");
    }
}

fn write_numbered<'a>(out: &mut String, items: impl Iterator<Item = &'a ExportedHighlight>) {
    for (position, item) in items.enumerate() {
        out.push_str(&format!("{}. {}\n", position + 1, item.text.trim()));
    }
}
