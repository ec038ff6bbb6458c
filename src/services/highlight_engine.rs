//! Highlight Engine for pagemark.
//!
//! Finds every occurrence of a term in the page text, wraps each one in a
//! `<mark class="kh-mark">` element and keeps the ordered marker list, the
//! per-term groups and the navigation cursor in step with the document.

use tracing::{debug, warn};

use crate::dom::{Document, ElementData, NodeId, SelectorIndex, TextTreeEditor};
use crate::managers::navigation_manager::{NavigationController, NavigationControllerTrait};
use crate::services::pattern_compiler::{self, MatchOptions, Matcher};
use crate::services::text_scanner;
use crate::types::highlight::{
    ClearOutcome, HighlightGroup, HighlightMarker, HighlightOutcome, HighlightState,
    ACTIVE_CLASS, DATA_GROUP, DATA_INDEX, DEFAULT_COLORS, DEFAULT_GROUP, MARK_CLASS, MARK_TAG,
};
use crate::types::preferences::{apply_transparency, HighlightPreferences};

/// Text nodes processed per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Batches processed between cooperative yields.
pub const DEFAULT_YIELD_EVERY: usize = 5;

/// Shortest word kept when a long term is split into words.
const MIN_WORD_CHARS: usize = 3;

/// The parts of a page a highlight pass reads and mutates.
pub struct HighlightScope<'a> {
    pub doc: &'a mut Document,
    /// Subtree searched and cleared; normally `<body>`.
    pub root: NodeId,
    pub state: &'a mut HighlightState,
    pub nav: &'a mut NavigationController,
}

/// What a `highlight_all` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub outcome: HighlightOutcome,
    /// The pass began by clearing every marker on the page.
    pub cleared_page: bool,
}

/// Batch-processing highlighter. Holds only tuning knobs; all page state
/// lives in the [`HighlightScope`] passed to each call.
#[derive(Debug, Clone)]
pub struct HighlightEngine {
    batch_size: usize,
    yield_every: usize,
}

impl Default for HighlightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightEngine {
    pub fn new() -> Self {
        Self::with_batching(DEFAULT_BATCH_SIZE, DEFAULT_YIELD_EVERY)
    }

    /// Zero values are bumped to 1.
    pub fn with_batching(batch_size: usize, yield_every: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            yield_every: yield_every.max(1),
        }
    }

    /// Highlights every occurrence of `term` under `scope.root`.
    ///
    /// Terms longer than `prefs.long_text_threshold` characters are split
    /// into words, each highlighted on its own. The task yields to the
    /// runtime every `yield_every` batches of text nodes.
    pub async fn highlight_all(
        &self,
        scope: &mut HighlightScope<'_>,
        prefs: &HighlightPreferences,
        term: &str,
        clear_existing: bool,
    ) -> PassReport {
        let mut report = PassReport::default();
        if term.trim().is_empty() {
            return report;
        }

        let multi_color = prefs.multi_color_mode;
        if clear_existing && !multi_color {
            Self::clear(scope, None);
            report.cleared_page = true;
        }

        let sub_terms = decompose_term(term, prefs.long_text_threshold);
        debug!(
            term_chars = term.chars().count(),
            sub_terms = sub_terms.len(),
            "starting highlight pass"
        );

        let options = MatchOptions::from(prefs);
        let include = prefs.include_selector_list();
        let exclude = prefs.exclude_selector_list();
        let mut total = 0;

        if clear_existing && multi_color {
            let mut removed = 0;
            for sub_term in &sub_terms {
                removed += unwrap_markers(scope.doc, scope.root, Some(sub_term.as_str()));
                if let Some(group) = scope.state.group_mut(sub_term) {
                    group.count = 0;
                }
            }
            if removed > 0 {
                Self::rebuild(scope);
            }
        }

        let include_index = SelectorIndex::build(scope.doc, &include);
        let exclude_index = SelectorIndex::build(scope.doc, &exclude);
        let cap = node_cap(scope.doc, scope.root);

        for sub_term in &sub_terms {
            let color = resolve_color(scope.state, prefs, sub_term);
            let group_id = if multi_color {
                sub_term.as_str()
            } else {
                DEFAULT_GROUP
            };

            let Some(matcher) = pattern_compiler::compile(sub_term, &options) else {
                continue;
            };

            let nodes = text_scanner::scan(
                scope.doc,
                scope.root,
                &include_index,
                &exclude_index,
                cap,
            );
            debug!(
                sub_term = %sub_term,
                nodes = nodes.len(),
                cap,
                color = %color,
                "searching text nodes"
            );

            let marker_group = multi_color.then_some(group_id);
            let mut count = 0;
            for (batch_no, batch) in nodes.chunks(self.batch_size).enumerate() {
                if batch_no > 0 && batch_no % self.yield_every == 0 {
                    tokio::task::yield_now().await;
                }
                for node in batch {
                    count += mark_text_node(scope, *node, &matcher, &color, marker_group);
                }
            }

            if multi_color {
                if let Some(group) = scope.state.group_mut(group_id) {
                    group.count += count;
                }
            }
            if count > 0 {
                scope.state.remember_term(sub_term);
            }
            total += count;
        }

        // several sub-terms append out of document order; re-derive it
        if total > 0 && (sub_terms.len() > 1 || scope.state.markers.len() > total) {
            Self::rebuild(scope);
        }

        let marker_count = scope.state.markers.len();
        if clear_existing || marker_count == total {
            let first = (marker_count > 0).then_some(0);
            scope.nav.set_cursor(first, marker_count);
        }

        match scope.nav.cursor() {
            Some(index) if marker_count > 0 => {
                scope
                    .nav
                    .goto_index(scope.doc, &scope.state.markers, index, false);
            }
            _ => scope.nav.refresh(marker_count),
        }

        report.outcome = HighlightOutcome {
            count: total,
            groups: scope.state.groups.clone(),
        };
        report
    }

    /// Removes markers under `scope.root`.
    ///
    /// With no group every marker goes, together with all groups, saved
    /// terms and the cursor. With a group only markers tagged with it are
    /// unwrapped; the group and its saved term are dropped and the list is
    /// re-indexed.
    pub fn clear(scope: &mut HighlightScope<'_>, group: Option<&str>) -> ClearOutcome {
        let removed = unwrap_markers(scope.doc, scope.root, group);
        match group {
            None => {
                scope.state.groups.clear();
                scope.state.markers.clear();
                scope.state.saved_terms.clear();
                scope.nav.reset(0);
                ClearOutcome {
                    removed,
                    found: true,
                }
            }
            Some(group_id) => {
                let existed = scope.state.remove_group(group_id);
                scope.state.forget_term(group_id);
                Self::rebuild(scope);
                ClearOutcome {
                    removed,
                    found: existed || removed > 0,
                }
            }
        }
    }

    /// Re-derives the marker list from the document, in document order,
    /// rewriting every `data-kh-index`. The active flag is moved to the
    /// marker under the (clamped) cursor.
    pub fn rebuild(scope: &mut HighlightScope<'_>) {
        let nodes: Vec<NodeId> = {
            let doc: &Document = scope.doc;
            doc.descendants(scope.root)
                .filter(|n| is_marker(doc, *n))
                .collect()
        };

        let mut markers = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.into_iter().enumerate() {
            scope.doc.set_attr(node, DATA_INDEX, &index.to_string());
            scope.doc.remove_class(node, ACTIVE_CLASS);
            let group = scope
                .doc
                .attr(node, DATA_GROUP)
                .unwrap_or(DEFAULT_GROUP)
                .to_string();
            markers.push(HighlightMarker { node, group, index });
        }
        scope.state.markers = markers;

        scope.nav.clamp(scope.state.markers.len());
        scope.nav.drop_stale_scroll_target(&scope.state.markers);
        if let Some(marker) = scope.nav.cursor().and_then(|c| scope.state.markers.get(c)) {
            scope.doc.add_class(marker.node, ACTIVE_CLASS);
        }
    }
}

/// Splits a long term into its words of at least three characters.
/// Shorter terms come back trimmed, as the only element.
pub fn decompose_term(term: &str, threshold: usize) -> Vec<String> {
    if term.chars().count() > threshold {
        term.split_whitespace()
            .filter(|word| word.chars().count() >= MIN_WORD_CHARS)
            .map(String::from)
            .collect()
    } else {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }
}

/// Text-node ceiling for a page, tighter for pages with more top-level
/// elements under `root`.
pub fn node_cap(doc: &Document, root: NodeId) -> usize {
    let top_level = doc.element_children(root).len();
    if top_level > 1000 {
        3000
    } else if top_level > 500 {
        5000
    } else {
        10000
    }
}

/// Picks the color for `term`.
///
/// Single-color mode always uses the preference color. Multi-color mode
/// reuses the group's color, or registers a new group with the first unused
/// palette color (cycling once the palette is exhausted).
pub fn resolve_color(state: &mut HighlightState, prefs: &HighlightPreferences, term: &str) -> String {
    if !prefs.multi_color_mode {
        return prefs.color.clone();
    }
    if let Some(group) = state.group(term) {
        return group.color.clone();
    }

    let fallback: Vec<String>;
    let palette: &[String] = if prefs.palette.is_empty() {
        fallback = DEFAULT_COLORS.iter().map(|c| c.to_string()).collect();
        &fallback
    } else {
        &prefs.palette
    };

    let tinted: Vec<String> = palette
        .iter()
        .map(|base| match prefs.transparency {
            Some(transparency) => apply_transparency(base, transparency),
            None => base.clone(),
        })
        .collect();
    let color = tinted
        .iter()
        .find(|candidate| !state.groups.iter().any(|g| &g.color == *candidate))
        .unwrap_or(&tinted[state.groups.len() % tinted.len()])
        .clone();

    state.groups.push(HighlightGroup {
        term: term.to_string(),
        color: color.clone(),
        count: 0,
    });
    color
}

fn is_marker(doc: &Document, node: NodeId) -> bool {
    doc.is_element_named(node, MARK_TAG) && doc.has_class(node, MARK_CLASS)
}

/// Unwraps markers (optionally only one group's) and merges the text they
/// leave behind. Returns how many were removed.
fn unwrap_markers(doc: &mut Document, root: NodeId, group: Option<&str>) -> usize {
    let targets: Vec<NodeId> = {
        let view: &Document = doc;
        view.descendants(root)
            .filter(|n| is_marker(view, *n))
            .filter(|n| group.is_none() || view.attr(*n, DATA_GROUP) == group)
            .collect()
    };

    let mut parents: Vec<NodeId> = Vec::new();
    for marker in &targets {
        if let Some(parent) = doc.unwrap(*marker) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
    }
    for parent in parents {
        doc.normalize(parent);
    }
    targets.len()
}

/// Wraps every match inside one text node. Returns the number of markers added.
fn mark_text_node(
    scope: &mut HighlightScope<'_>,
    node: NodeId,
    matcher: &Matcher,
    color: &str,
    group: Option<&str>,
) -> usize {
    let ranges = match scope.doc.text(node) {
        Some(text) => matcher.find_ranges(text),
        None => return 0,
    };

    let mut current = node;
    let mut consumed = 0;
    let mut added = 0;
    for (start, end) in ranges {
        let index = scope.state.markers.len();
        let mut wrapper = ElementData::new(MARK_TAG)
            .with_attr("class", MARK_CLASS)
            .with_attr("style", &format!("background: {};", color));
        if let Some(group_id) = group {
            wrapper.set_attr(DATA_GROUP, group_id);
        }
        wrapper.set_attr(DATA_INDEX, &index.to_string());

        let Some(wrapped) = scope
            .doc
            .wrap_range(current, start - consumed, end - consumed, wrapper)
        else {
            warn!(start, end, "could not wrap match, skipping rest of node");
            break;
        };
        scope.state.markers.push(HighlightMarker {
            node: wrapped.wrapper,
            group: group.unwrap_or(DEFAULT_GROUP).to_string(),
            index,
        });
        added += 1;

        match wrapped.after {
            Some(after) => {
                current = after;
                consumed = end;
            }
            None => break,
        }
    }
    added
}
