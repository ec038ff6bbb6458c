//! Property-based tests for marker ordering across highlight passes.
//!
//! However terms are added, the marker list stays in document order with
//! each marker's index equal to its position, and markers never nest.

use pagemark::dom::{Document, NodeId};
use pagemark::managers::navigation_manager::NavigationController;
use pagemark::services::highlight_engine::{HighlightEngine, HighlightScope};
use pagemark::types::highlight::{HighlightState, DATA_INDEX, MARK_TAG};
use pagemark::types::preferences::HighlightPreferences;
use proptest::prelude::*;

const VOCABULARY: &[&str] = &["fox", "dog", "the", "quick", "lazy", "runs", "over"];

fn arb_page() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::collection::vec(prop::sample::select(VOCABULARY), 1..15)
            .prop_map(|words| format!("<p>{}</p>", words.join(" "))),
        1..6,
    )
    .prop_map(|paragraphs| format!("<html><body>{}</body></html>", paragraphs.concat()))
}

fn arb_terms() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop_oneof![prop::sample::select(VOCABULARY), Just("o"), Just("he")],
        1..5,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

async fn highlight(
    doc: &mut Document,
    state: &mut HighlightState,
    nav: &mut NavigationController,
    prefs: &HighlightPreferences,
    term: &str,
    clear: bool,
) -> usize {
    let root = doc.body().unwrap_or_else(|| doc.root());
    let mut scope = HighlightScope {
        doc,
        root,
        state,
        nav,
    };
    HighlightEngine::new()
        .highlight_all(&mut scope, prefs, term, clear)
        .await
        .outcome
        .count
}

fn check_order(doc: &Document, state: &HighlightState) -> Result<(), TestCaseError> {
    let positions: Vec<usize> = state
        .markers
        .iter()
        .map(|m| doc.document_position(m.node).unwrap_or(usize::MAX))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    prop_assert_eq!(&positions, &sorted);
    prop_assert!(!positions.contains(&usize::MAX), "every marker is attached");

    for (position, marker) in state.markers.iter().enumerate() {
        prop_assert_eq!(marker.index, position);
        let expected = position.to_string();
        prop_assert_eq!(doc.attr(marker.node, DATA_INDEX), Some(expected.as_str()));
        let nested = doc
            .ancestors(marker.node)
            .any(|a: NodeId| doc.is_element_named(a, MARK_TAG));
        prop_assert!(!nested, "markers never nest");
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn additive_passes_keep_document_order(html in arb_page(), terms in arb_terms()) {
        let prefs = HighlightPreferences {
            multi_color_mode: true,
            ..HighlightPreferences::default()
        }
        .resolved();
        let mut doc = Document::parse(&html);
        let text_before = doc.text_content(doc.root());
        let mut state = HighlightState::default();
        let mut nav = NavigationController::new();

        runtime().block_on(async {
            for term in &terms {
                highlight(&mut doc, &mut state, &mut nav, &prefs, term, false).await;
                check_order(&doc, &state)?;
            }
            Ok::<(), TestCaseError>(())
        })?;
        prop_assert_eq!(doc.text_content(doc.root()), text_before);
    }

    #[test]
    fn rehighlight_with_clear_is_idempotent(html in arb_page(), term in prop::sample::select(VOCABULARY)) {
        let prefs = HighlightPreferences::default().resolved();
        let mut doc = Document::parse(&html);
        let mut state = HighlightState::default();
        let mut nav = NavigationController::new();

        runtime().block_on(async {
            let first = highlight(&mut doc, &mut state, &mut nav, &prefs, term, true).await;
            let html_after_first = doc.to_html();
            let second = highlight(&mut doc, &mut state, &mut nav, &prefs, term, true).await;
            prop_assert_eq!(first, second);
            prop_assert_eq!(doc.to_html(), html_after_first);
            check_order(&doc, &state)
        })?;
    }
}
