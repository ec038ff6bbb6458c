use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// Readable content extracted from a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub title: String,
    pub url: String,
    /// Whitespace-collapsed plain text.
    pub text: String,
    /// Cleaned HTML of the winning container (or the whole body on fallback).
    pub html: String,
    pub word_count: usize,
    pub estimated_read_time_minutes: u32,
    /// Link-density-scaled score of the best container; 0 when none qualified.
    pub score: f64,
    /// `true` when no container cleared the confidence floor.
    pub used_fallback: bool,
}

/// A container element and its accumulated score during a scoring pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentCandidate {
    pub node: NodeId,
    pub score: f64,
}
