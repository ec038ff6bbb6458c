//! CSS selector matching against the arena tree.
//!
//! Selectors are compiled with `scraper`. The current tree is serialized with
//! each element tagged by its node id, re-parsed, and the ids of every matching
//! element are collected, so lookups afterwards are plain set membership.

use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::warn;

use super::tree::{Document, NodeId};

/// Attribute carrying the arena id in the tagged snapshot.
const NODE_ID_ATTR: &str = "data-pagemark-node";

/// Set of elements matched by any selector in a list.
#[derive(Debug, Clone, Default)]
pub struct SelectorIndex {
    matched: HashSet<NodeId>,
    configured: bool,
}

impl SelectorIndex {
    /// Evaluates `selectors` against the current state of `doc`.
    ///
    /// Selectors that fail to parse are logged and match nothing.
    pub fn build(doc: &Document, selectors: &[String]) -> Self {
        let mut index = SelectorIndex {
            matched: HashSet::new(),
            configured: !selectors.is_empty(),
        };

        let compiled: Vec<Selector> = selectors
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some(selector),
                Err(err) => {
                    warn!(selector = %raw, error = ?err, "ignoring invalid CSS selector");
                    None
                }
            })
            .collect();
        if compiled.is_empty() {
            return index;
        }

        let snapshot = Html::parse_document(&doc.to_tagged_html(NODE_ID_ATTR));
        for selector in &compiled {
            for element in snapshot.select(selector) {
                if let Some(id) = element
                    .value()
                    .attr(NODE_ID_ATTR)
                    .and_then(|v| v.parse::<usize>().ok())
                {
                    index.matched.insert(NodeId::from_index(id));
                }
            }
        }
        index
    }

    /// Whether a (possibly empty) selector list was supplied.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn matches(&self, id: NodeId) -> bool {
        self.matched.contains(&id)
    }

    /// Like `Element.closest`: true if `id` or any ancestor matched.
    pub fn matches_closest(&self, doc: &Document, id: NodeId) -> bool {
        self.matches(id) || doc.ancestors(id).any(|a| self.matches(a))
    }
}
