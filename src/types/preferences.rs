use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::highlight::DEFAULT_COLORS;

static RGB_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"rgba?\((\d+),\s*(\d+),\s*(\d+)").expect("static pattern is valid")
});

/// User preferences read by every highlight operation.
///
/// Missing fields fall back to their defaults when loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightPreferences {
    /// Marker color in single-color mode.
    pub color: String,
    /// Opacity in percent applied to `color` and to palette colors.
    pub transparency: Option<u8>,
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub use_regex: bool,
    pub palette: Vec<String>,
    pub multi_color_mode: bool,
    pub persist_highlights: bool,
    /// Newline-separated CSS selectors; text must sit inside one of them.
    pub include_selectors: String,
    /// Newline-separated CSS selectors; text inside any of them is skipped.
    pub exclude_selectors: String,
    /// Terms longer than this many characters are split into words.
    pub long_text_threshold: usize,
    /// Maximum number of entries kept in the highlight history index.
    pub history_limit: usize,
    /// Quiet period used to coalesce bursts of highlight requests.
    pub debounce_ms: u64,
}

impl Default for HighlightPreferences {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLORS[0].to_string(),
            transparency: Some(60),
            case_sensitive: false,
            whole_word: false,
            use_regex: false,
            palette: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
            multi_color_mode: false,
            persist_highlights: true,
            include_selectors: String::new(),
            exclude_selectors: String::new(),
            long_text_threshold: 100,
            history_limit: 1000,
            debounce_ms: 150,
        }
    }
}

impl HighlightPreferences {
    /// Returns a copy with the transparency folded into `color`.
    pub fn resolved(&self) -> Self {
        let mut prefs = self.clone();
        if let Some(transparency) = self.transparency {
            prefs.color = apply_transparency(&self.color, transparency);
        }
        prefs
    }

    pub fn include_selector_list(&self) -> Vec<String> {
        parse_selectors(&self.include_selectors)
    }

    pub fn exclude_selector_list(&self) -> Vec<String> {
        parse_selectors(&self.exclude_selectors)
    }
}

/// Splits a newline-separated selector list, dropping blank lines.
pub fn parse_selectors(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Rewrites an `rgb(..)`/`rgba(..)` color with alpha `transparency / 100`.
///
/// Colors in any other notation are returned unchanged.
pub fn apply_transparency(color: &str, transparency: u8) -> String {
    match RGB_PREFIX.captures(color) {
        Some(caps) => {
            let alpha = f64::from(transparency) / 100.0;
            format!("rgba({}, {}, {}, {})", &caps[1], &caps[2], &caps[3], alpha)
        }
        None => color.to_string(),
    }
}
