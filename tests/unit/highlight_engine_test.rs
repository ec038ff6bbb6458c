//! Unit tests for highlight passes, clearing and marker bookkeeping.

use pagemark::dom::{Document, NodeId};
use pagemark::managers::navigation_manager::{NavigationController, NavigationControllerTrait};
use pagemark::services::highlight_engine::{
    decompose_term, node_cap, resolve_color, HighlightEngine, HighlightScope, PassReport,
};
use pagemark::types::highlight::{
    HighlightState, ACTIVE_CLASS, DATA_GROUP, DATA_INDEX, DEFAULT_GROUP, MARK_CLASS,
};
use pagemark::types::preferences::HighlightPreferences;

const FOX_PAGE: &str =
    "<html><body><p>The quick brown fox jumps over the lazy dog. The fox runs.</p></body></html>";

struct Page {
    doc: Document,
    state: HighlightState,
    nav: NavigationController,
}

impl Page {
    fn new(html: &str) -> Self {
        Self {
            doc: Document::parse(html),
            state: HighlightState::default(),
            nav: NavigationController::new(),
        }
    }

    fn body(&self) -> NodeId {
        self.doc.body().expect("body")
    }

    async fn highlight(&mut self, prefs: &HighlightPreferences, term: &str, clear: bool) -> PassReport {
        self.highlight_with(&HighlightEngine::new(), prefs, term, clear).await
    }

    async fn highlight_with(
        &mut self,
        engine: &HighlightEngine,
        prefs: &HighlightPreferences,
        term: &str,
        clear: bool,
    ) -> PassReport {
        let root = self.body();
        let mut scope = HighlightScope {
            doc: &mut self.doc,
            root,
            state: &mut self.state,
            nav: &mut self.nav,
        };
        engine.highlight_all(&mut scope, prefs, term, clear).await
    }

    fn clear(&mut self, group: Option<&str>) -> pagemark::types::highlight::ClearOutcome {
        let root = self.body();
        let mut scope = HighlightScope {
            doc: &mut self.doc,
            root,
            state: &mut self.state,
            nav: &mut self.nav,
        };
        HighlightEngine::clear(&mut scope, group)
    }

    fn marker_texts(&self) -> Vec<String> {
        self.state
            .markers
            .iter()
            .map(|m| self.doc.text_content(m.node))
            .collect()
    }

    fn assert_markers_ordered(&self) {
        let positions: Vec<usize> = self
            .state
            .markers
            .iter()
            .map(|m| self.doc.document_position(m.node).expect("attached"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "markers must be in document order");
        for (i, marker) in self.state.markers.iter().enumerate() {
            assert_eq!(marker.index, i);
            assert_eq!(self.doc.attr(marker.node, DATA_INDEX), Some(i.to_string().as_str()));
        }
    }
}

fn multi_color() -> HighlightPreferences {
    HighlightPreferences {
        multi_color_mode: true,
        ..HighlightPreferences::default()
    }
}

// ─── Single-color passes ───

#[tokio::test]
async fn test_fox_scenario() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = HighlightPreferences::default().resolved();
    let before = page.doc.text_content(page.body());

    let report = page.highlight(&prefs, "fox", true).await;

    assert_eq!(report.outcome.count, 2);
    assert!(report.outcome.groups.is_empty());
    assert!(report.cleared_page);
    assert_eq!(page.marker_texts(), vec!["fox", "fox"]);
    assert_eq!(page.doc.text_content(page.body()), before);
    assert_eq!(page.nav.cursor(), Some(0));
    assert_eq!(page.nav.counter(), "1 of 2");
    assert!(page.doc.has_class(page.state.markers[0].node, ACTIVE_CLASS));
    assert!(!page.doc.has_class(page.state.markers[1].node, ACTIVE_CLASS));
    assert_eq!(page.state.saved_terms, vec!["fox".to_string()]);
}

#[tokio::test]
async fn test_marker_markup() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = HighlightPreferences::default().resolved();
    page.highlight(&prefs, "dog", true).await;

    let marker = page.state.markers[0].node;
    assert_eq!(page.doc.tag_name(marker), Some("mark"));
    assert!(page.doc.has_class(marker, MARK_CLASS));
    assert_eq!(
        page.doc.attr(marker, "style"),
        Some("background: rgba(59, 130, 246, 0.6);")
    );
    assert_eq!(page.doc.attr(marker, DATA_GROUP), None);
    assert_eq!(page.state.markers[0].group, DEFAULT_GROUP);
}

#[tokio::test]
async fn test_rehighlight_with_clear_is_idempotent() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = HighlightPreferences::default();

    let first = page.highlight(&prefs, "the", true).await;
    let html_after_first = page.doc.to_html();
    let second = page.highlight(&prefs, "the", true).await;

    assert_eq!(first.outcome.count, 3);
    assert_eq!(second.outcome.count, 3);
    assert_eq!(page.state.markers.len(), 3);
    assert_eq!(page.doc.to_html(), html_after_first);
}

#[tokio::test]
async fn test_empty_term_changes_nothing() {
    let mut page = Page::new(FOX_PAGE);
    let html = page.doc.to_html();
    let report = page.highlight(&HighlightPreferences::default(), "   ", true).await;
    assert_eq!(report.outcome.count, 0);
    assert!(!report.cleared_page);
    assert_eq!(page.doc.to_html(), html);
}

#[tokio::test]
async fn test_no_match_reports_zero_and_no_matches_label() {
    let mut page = Page::new(FOX_PAGE);
    let report = page.highlight(&HighlightPreferences::default(), "zebra", true).await;
    assert_eq!(report.outcome.count, 0);
    assert!(page.state.markers.is_empty());
    assert!(page.state.saved_terms.is_empty());
    assert_eq!(page.nav.counter(), "No matches");
}

#[tokio::test]
async fn test_matches_across_many_nodes_with_small_batches() {
    let paragraphs: String = (0..57).map(|i| format!("<p>item {} fox</p>", i)).collect();
    let mut page = Page::new(&format!("<body>{}</body>", paragraphs));
    let engine = HighlightEngine::with_batching(4, 2);

    let report = page
        .highlight_with(&engine, &HighlightPreferences::default(), "fox", true)
        .await;

    assert_eq!(report.outcome.count, 57);
    page.assert_markers_ordered();
}

#[tokio::test]
async fn test_highlighting_never_nests_markers() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = HighlightPreferences::default();
    page.highlight(&prefs, "fox", true).await;
    let report = page.highlight(&prefs, "ox", false).await;

    assert_eq!(report.outcome.count, 0);
    assert_eq!(page.state.markers.len(), 2);
}

// ─── Clearing ───

#[tokio::test]
async fn test_clear_restores_original_markup() {
    let mut page = Page::new(FOX_PAGE);
    let original = page.doc.to_html();
    page.highlight(&HighlightPreferences::default(), "o", true).await;
    assert_ne!(page.doc.to_html(), original);

    let outcome = page.clear(None);

    assert!(outcome.found);
    assert!(outcome.removed > 0);
    assert_eq!(page.doc.to_html(), original);
    assert!(page.state.markers.is_empty());
    assert!(page.state.saved_terms.is_empty());
    assert_eq!(page.nav.cursor(), None);
}

// ─── Multi-color passes ───

#[tokio::test]
async fn test_multi_color_groups_get_distinct_colors() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = multi_color();

    page.highlight(&prefs, "fox", false).await;
    let report = page.highlight(&prefs, "dog", false).await;

    assert_eq!(report.outcome.count, 1);
    let groups = &report.outcome.groups;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].term, "fox");
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[1].term, "dog");
    assert_eq!(groups[1].count, 1);
    assert_ne!(groups[0].color, groups[1].color);

    assert_eq!(page.marker_texts(), vec!["fox", "dog", "fox"]);
    page.assert_markers_ordered();
    let dog = page.state.markers[1].node;
    assert_eq!(page.doc.attr(dog, DATA_GROUP), Some("dog"));
}

#[tokio::test]
async fn test_multi_color_clear_existing_only_resets_its_group() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = multi_color();

    page.highlight(&prefs, "fox", false).await;
    page.highlight(&prefs, "dog", false).await;
    let color = page.state.group("fox").unwrap().color.clone();
    let report = page.highlight(&prefs, "fox", true).await;

    assert_eq!(report.outcome.count, 2);
    assert!(!report.cleared_page);
    assert_eq!(page.state.group("fox").unwrap().count, 2);
    assert_eq!(page.state.group("fox").unwrap().color, color);
    assert_eq!(page.state.markers.len(), 3);
    page.assert_markers_ordered();
}

#[tokio::test]
async fn test_clear_group_isolation() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = multi_color();
    page.highlight(&prefs, "fox", false).await;
    page.highlight(&prefs, "dog", false).await;

    let outcome = page.clear(Some("fox"));

    assert!(outcome.found);
    assert_eq!(outcome.removed, 2);
    assert_eq!(page.marker_texts(), vec!["dog"]);
    assert!(page.state.group("fox").is_none());
    assert!(page.state.group("dog").is_some());
    assert_eq!(page.state.saved_terms, vec!["dog".to_string()]);
    page.assert_markers_ordered();
}

#[tokio::test]
async fn test_clearing_scrolled_group_forgets_scroll_target() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = multi_color();
    page.highlight(&prefs, "fox", false).await;
    page.highlight(&prefs, "dog", false).await;
    assert!(page.nav.goto_index(&mut page.doc, &page.state.markers, 2, true));
    let fox = page.state.markers[2].node;
    assert_eq!(page.nav.scroll_target(), Some(fox));

    page.clear(Some("fox"));

    assert_eq!(page.nav.scroll_target(), None);
    // the released slots are handed out again by the next pass
    page.highlight(&prefs, "lazy", false).await;
    assert_eq!(page.nav.scroll_target(), None);
    assert_eq!(page.marker_texts(), vec!["lazy", "dog"]);
}

#[tokio::test]
async fn test_clear_unknown_group_is_not_found() {
    let mut page = Page::new(FOX_PAGE);
    page.highlight(&multi_color(), "fox", false).await;
    let outcome = page.clear(Some("zebra"));
    assert!(!outcome.found);
    assert_eq!(outcome.removed, 0);
    assert_eq!(page.state.markers.len(), 2);
}

#[tokio::test]
async fn test_long_term_is_split_into_words() {
    let words = [
        "quick", "brown", "jumps", "lazy", "runs", "alpha", "bravo", "charlie", "delta", "echo",
        "foxtrot", "golf", "hotel", "india", "juliet", "kilo", "lima", "mike", "november",
        "oscar", "papa", "quebec", "romeo",
    ];
    let term = words.join(" ");
    assert!(term.chars().count() > 100);

    let mut page = Page::new(FOX_PAGE);
    let report = page.highlight(&multi_color(), &term, false).await;

    // quick, brown, jumps, lazy and runs occur once each
    assert_eq!(report.outcome.count, 5);
    assert_eq!(page.state.groups.len(), words.len());
    page.assert_markers_ordered();
    assert_eq!(
        page.state.saved_terms,
        vec!["quick", "brown", "jumps", "lazy", "runs"]
    );
}

#[tokio::test]
async fn test_long_term_with_repeated_words_counts_matches_once() {
    let term = vec!["fox"; 40].join(" ");
    assert!(term.chars().count() > 100);

    let mut page = Page::new(FOX_PAGE);
    page.highlight(&multi_color(), "fox", false).await;
    let report = page.highlight(&multi_color(), &term, true).await;

    assert_eq!(report.outcome.count, 2);
    assert_eq!(page.state.groups.len(), 1);
    assert_eq!(page.state.group("fox").unwrap().count, 2);
    assert_eq!(page.marker_texts(), vec!["fox", "fox"]);
    page.assert_markers_ordered();
}

#[tokio::test]
async fn test_long_term_honors_exclude_selectors_for_every_word() {
    let prefs = HighlightPreferences {
        multi_color_mode: true,
        exclude_selectors: "aside".to_string(),
        ..HighlightPreferences::default()
    };
    let term = ["quick", "brown", "fox", "lazy", "dog"].repeat(6).join(" ");
    assert!(term.chars().count() > 100);

    let mut page = Page::new(
        "<html><body><p>The quick brown fox.</p>\
         <aside>A lazy dog and a quick fox.</aside><p>The lazy dog.</p></body></html>",
    );
    let report = page.highlight(&prefs, &term, true).await;

    assert_eq!(report.outcome.count, 5);
    assert_eq!(
        page.marker_texts(),
        vec!["quick", "brown", "fox", "lazy", "dog"]
    );
    let aside = page.doc.find_element("aside").expect("aside");
    assert!(page.doc.element_children(aside).is_empty());
    page.assert_markers_ordered();
}

// ─── Arena reuse ───

#[tokio::test]
async fn test_repeated_clear_passes_keep_arena_bounded() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = HighlightPreferences::default();

    page.highlight(&prefs, "fox", true).await;
    let settled = page.doc.arena_len();
    for _ in 0..200 {
        let report = page.highlight(&prefs, "fox", true).await;
        assert_eq!(report.outcome.count, 2);
    }

    assert!(
        page.doc.arena_len() <= settled + 16,
        "arena grew from {} to {}",
        settled,
        page.doc.arena_len()
    );
    assert_eq!(page.marker_texts(), vec!["fox", "fox"]);
    page.assert_markers_ordered();
}

#[tokio::test]
async fn test_multi_color_regroups_keep_arena_bounded() {
    let mut page = Page::new(FOX_PAGE);
    let prefs = multi_color();

    page.highlight(&prefs, "fox", false).await;
    page.highlight(&prefs, "dog", false).await;
    let settled = page.doc.arena_len();
    for _ in 0..100 {
        page.highlight(&prefs, "fox", true).await;
        page.clear(Some("dog"));
        page.highlight(&prefs, "dog", false).await;
    }

    assert!(page.doc.arena_len() <= settled + 16);
    assert_eq!(page.marker_texts(), vec!["fox", "dog", "fox"]);
    page.assert_markers_ordered();
}

// ─── Helpers ───

#[test]
fn test_decompose_term_threshold() {
    let term = "a".repeat(100);
    assert_eq!(decompose_term(&term, 100), vec![term.clone()]);
    let long = format!("{} of cats", "b".repeat(100));
    assert_eq!(
        decompose_term(&long, 100),
        vec!["b".repeat(100), "cats".to_string()]
    );
}

#[test]
fn test_node_cap_scales_with_page_size() {
    let small = Document::parse("<body><p>x</p></body>");
    assert_eq!(node_cap(&small, small.body().unwrap()), 10000);

    let medium = Document::parse(&format!("<body>{}</body>", "<p>x</p>".repeat(501)));
    assert_eq!(node_cap(&medium, medium.body().unwrap()), 5000);

    let large = Document::parse(&format!("<body>{}</body>", "<p>x</p>".repeat(1001)));
    assert_eq!(node_cap(&large, large.body().unwrap()), 3000);
}

#[test]
fn test_resolve_color_with_custom_transparency() {
    let prefs = HighlightPreferences {
        multi_color_mode: true,
        transparency: Some(35),
        ..HighlightPreferences::default()
    };
    let mut state = HighlightState::default();
    let first = resolve_color(&mut state, &prefs, "fox");
    let second = resolve_color(&mut state, &prefs, "dog");
    let again = resolve_color(&mut state, &prefs, "fox");

    assert_eq!(first, "rgba(59, 130, 246, 0.35)");
    assert_eq!(second, "rgba(236, 72, 153, 0.35)");
    assert_eq!(again, first);
    assert_eq!(state.groups.len(), 2);
}

#[test]
fn test_resolve_color_single_mode_uses_preference() {
    let prefs = HighlightPreferences {
        color: "rgba(1, 2, 3, 0.5)".to_string(),
        ..HighlightPreferences::default()
    };
    let mut state = HighlightState::default();
    assert_eq!(resolve_color(&mut state, &prefs, "fox"), "rgba(1, 2, 3, 0.5)");
    assert!(state.groups.is_empty());
}
