//! Reader Mode for pagemark.
//!
//! Finds the main content container of a page by scoring paragraph parents
//! on text density, class/id keywords and link density, then returns a
//! cleaned copy of it. Pages with no convincing container fall back to a
//! filtered walk over the body text. The live document is never modified.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::dom::tree::collapse_whitespace;
use crate::dom::{Document, NodeId};
use crate::types::reader::{ArticleContent, ContentCandidate};

static POSITIVE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(article|body|content|entry|hentry|main|page|pagination|post|text|blog|story)")
        .expect("static pattern is valid")
});

static NEGATIVE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(comment|com-|contact|foot|footer|footnote|masthead|media|meta|outbrain|promo|related|scroll|shoutbox|sidebar|sponsor|shopping|tags|tool|widget|header|nav|menu|social)",
    )
    .expect("static pattern is valid")
});

/// Class/id keywords of elements dropped from the winning container.
static NOISE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(share|social|related|sidebar|advert|promo|sponsor|newsletter|subscribe|comment|meta|tags)",
    )
    .expect("static pattern is valid")
});

/// Class/id keywords of containers skipped by the body-text fallback.
static BOILERPLATE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(menu|nav|footer|header|social|share|sidebar|popup|modal|cookie)")
        .expect("static pattern is valid")
});

/// Tags stripped from the winning container.
const STRIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "button", "input", "select", "textarea",
    "nav", "footer", "header", "aside",
];

/// Containers whose text the body-text fallback ignores.
const FALLBACK_SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "head", "nav", "footer", "header",
    "aside", "button",
];

/// Attributes checked, in order, for the real source of a lazy-loaded image.
const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy"];

const IMAGE_STYLE: &str = "display: block; max-width: 100%; height: auto; margin: 1em auto;";

/// Points for containing a qualifying paragraph.
const PARENT_BASE_SCORE: f64 = 10.0;
const GRANDPARENT_BASE_SCORE: f64 = 5.0;
const POSITIVE_HINT_SCORE: f64 = 5.0;
const NEGATIVE_HINT_SCORE: f64 = -25.0;

/// Trait defining reader mode operations.
pub trait ReaderModeTrait {
    fn is_article_page(&self, doc: &Document) -> bool;
    fn score_candidates(&self, doc: &Document) -> Vec<ContentCandidate>;
    fn extract_content(&self, doc: &Document, url: &str) -> ArticleContent;
}

/// Heuristic readability extractor.
#[derive(Debug, Clone)]
pub struct ReaderMode {
    /// Paragraphs shorter than this many characters are not scored.
    min_paragraph_chars: usize,
    /// Winning scores below this trigger the body-text fallback.
    confidence_floor: f64,
}

impl ReaderMode {
    pub fn new() -> Self {
        Self {
            min_paragraph_chars: 25,
            confidence_floor: 20.0,
        }
    }

    /// Estimates reading time based on word count (~200 words/min).
    fn estimate_read_time(word_count: usize) -> u32 {
        ((word_count as f64) / 200.0).ceil().max(1.0) as u32
    }

    fn class_weight(doc: &Document, node: NodeId) -> f64 {
        let Some(element) = doc.element(node) else {
            return 0.0;
        };
        let props = element.class_and_id();
        let mut weight = 0.0;
        if POSITIVE_HINTS.is_match(&props) {
            weight += POSITIVE_HINT_SCORE;
        }
        if NEGATIVE_HINTS.is_match(&props) {
            weight += NEGATIVE_HINT_SCORE;
        }
        weight
    }

    /// Fraction of the element's text that sits inside anchors.
    pub fn link_density(doc: &Document, node: NodeId) -> f64 {
        let total = doc.text_len(node);
        if total == 0 {
            return 0.0;
        }
        let linked: usize = doc
            .elements_by_tag(node, "a")
            .into_iter()
            .map(|a| doc.text_len(a))
            .sum();
        linked as f64 / total as f64
    }

    fn top_candidate(&self, doc: &Document) -> Option<ContentCandidate> {
        let mut best: Option<ContentCandidate> = None;
        for candidate in self.score_candidates(doc) {
            let current = best.map(|b| b.score).unwrap_or(0.0);
            if candidate.score > current {
                best = Some(candidate);
            }
        }
        best
    }

    /// Whitespace-collapsed body text, skipping non-content and
    /// boilerplate containers below the body. The body's own class and
    /// id are not checked.
    fn body_text_fallback(doc: &Document) -> String {
        let scope = doc.body().unwrap_or_else(|| doc.root());
        let mut pieces: Vec<&str> = Vec::new();
        for node in doc.descendants(scope) {
            let Some(text) = doc.text(node) else {
                continue;
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            let skipped = doc
                .ancestors(node)
                .take_while(|a| *a != scope)
                .filter_map(|a| doc.element(a))
                .take_while(|e| e.name != "html")
                .any(|e| {
                    FALLBACK_SKIP_TAGS.contains(&e.name.as_str())
                        || BOILERPLATE_HINTS.is_match(&e.class_and_id())
                });
            if !skipped {
                pieces.push(trimmed);
            }
        }
        collapse_whitespace(&pieces.join(" "))
    }

    /// Copies the winner into a fresh document and strips it down to content.
    fn clean_candidate(doc: &Document, node: NodeId) -> (Document, NodeId) {
        let (mut copy, root) = doc.clone_subtree(node);

        for tag in STRIP_TAGS {
            for element in copy.elements_by_tag(root, tag) {
                copy.detach(element);
            }
        }

        let noisy: Vec<NodeId> = copy
            .descendants(root)
            .filter(|n| {
                copy.element(*n)
                    .map(|e| NOISE_HINTS.is_match(&e.class_and_id()))
                    .unwrap_or(false)
            })
            .collect();
        for element in noisy {
            copy.detach(element);
        }

        normalize_images(&mut copy, root);
        (copy, root)
    }
}

impl Default for ReaderMode {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderModeTrait for ReaderMode {
    fn is_article_page(&self, doc: &Document) -> bool {
        if doc.find_element("article").is_some() {
            return true;
        }
        self.top_candidate(doc)
            .map(|c| c.score >= self.confidence_floor)
            .unwrap_or(false)
    }

    /// Scores every paragraph parent and grandparent, then scales each score
    /// by `1 - link density`. Candidates come back in first-seen order.
    fn score_candidates(&self, doc: &Document) -> Vec<ContentCandidate> {
        let mut order: Vec<NodeId> = Vec::new();
        let mut scores: HashMap<NodeId, f64> = HashMap::new();

        for paragraph in doc.elements_by_tag(doc.root(), "p") {
            let text = doc.text_content(paragraph);
            let chars = text.chars().count();
            if chars < self.min_paragraph_chars {
                continue;
            }
            let Some(parent) = doc.parent_element(paragraph) else {
                continue;
            };
            let grandparent = doc.parent_element(parent);

            if !scores.contains_key(&parent) {
                scores.insert(parent, Self::class_weight(doc, parent) + PARENT_BASE_SCORE);
                order.push(parent);
            }
            if let Some(gp) = grandparent {
                if !scores.contains_key(&gp) {
                    scores.insert(gp, Self::class_weight(doc, gp) + GRANDPARENT_BASE_SCORE);
                    order.push(gp);
                }
            }

            let commas = text.split(',').count() as f64;
            let length_bonus = (chars / 100).min(3) as f64;
            let content_score = 1.0 + commas + length_bonus;

            if let Some(score) = scores.get_mut(&parent) {
                *score += content_score;
            }
            if let Some(score) = grandparent.and_then(|gp| scores.get_mut(&gp)) {
                *score += content_score / 2.0;
            }
        }

        order
            .into_iter()
            .map(|node| {
                let raw = scores.get(&node).copied().unwrap_or(0.0);
                ContentCandidate {
                    node,
                    score: raw * (1.0 - Self::link_density(doc, node)),
                }
            })
            .collect()
    }

    fn extract_content(&self, doc: &Document, url: &str) -> ArticleContent {
        let title = doc.title();
        let top = self.top_candidate(doc);
        let best_score = top.map(|c| c.score).unwrap_or(0.0);

        let (text, html, used_fallback) = match top {
            Some(candidate) if candidate.score >= self.confidence_floor => {
                debug!(
                    tag = doc.tag_name(candidate.node).unwrap_or(""),
                    score = candidate.score,
                    "top content candidate"
                );
                let (copy, root) = Self::clean_candidate(doc, candidate.node);
                (
                    collapse_whitespace(&copy.text_content(root)),
                    copy.inner_html(root),
                    false,
                )
            }
            _ => {
                debug!(best_score, "no confident candidate, using body text");
                let html = doc.body().map(|b| doc.inner_html(b)).unwrap_or_default();
                (Self::body_text_fallback(doc), html, true)
            }
        };

        let word_count = text.split_whitespace().count();
        ArticleContent {
            title,
            url: url.to_string(),
            text,
            html,
            word_count,
            estimated_read_time_minutes: Self::estimate_read_time(word_count),
            score: best_score,
            used_fallback,
        }
    }
}

/// Points every image at its real source and makes it render as a block.
pub fn normalize_images(doc: &mut Document, root: NodeId) {
    for image in doc.elements_by_tag(root, "img") {
        let real_src = LAZY_SRC_ATTRS
            .iter()
            .filter_map(|attr| doc.attr(image, attr))
            .chain(doc.attr(image, "src"))
            .find(|value| !value.trim().is_empty())
            .map(str::to_string);

        if let Some(src) = real_src {
            doc.set_attr(image, "src", &src);
            doc.remove_attr(image, "data-src");
            doc.remove_attr(image, "loading");
        }

        let style = match doc.attr(image, "style").map(str::trim) {
            Some(existing) if !existing.is_empty() => {
                let separator = if existing.ends_with(';') { " " } else { "; " };
                format!("{}{}{}", existing, separator, IMAGE_STYLE)
            }
            _ => IMAGE_STYLE.to_string(),
        };
        doc.set_attr(image, "style", &style);
    }
}
