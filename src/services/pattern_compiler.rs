//! Turns a user-typed term plus matching flags into a compiled matcher.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::types::preferences::HighlightPreferences;

/// Flags that control how a term is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub use_regex: bool,
}

impl From<&HighlightPreferences> for MatchOptions {
    fn from(prefs: &HighlightPreferences) -> Self {
        Self {
            case_sensitive: prefs.case_sensitive,
            whole_word: prefs.whole_word,
            use_regex: prefs.use_regex,
        }
    }
}

/// A compiled search pattern. Matching is always global.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    literal_fallback: bool,
}

impl Matcher {
    /// Byte ranges of every non-empty match in `text`, left to right.
    pub fn find_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .filter(|m| m.start() < m.end())
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.find_iter(text).any(|m| m.start() < m.end())
    }

    /// The final pattern source, after escaping and boundary wrapping.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// `true` when regex mode was requested but the term failed to compile.
    pub fn is_literal_fallback(&self) -> bool {
        self.literal_fallback
    }
}

/// Compiles `term` under `options`. Returns `None` for blank input.
///
/// In regex mode an invalid pattern falls back to matching the term
/// literally; this is logged and never reported as an error.
pub fn compile(term: &str, options: &MatchOptions) -> Option<Matcher> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    if options.use_regex {
        let wrap = options.whole_word && !term.starts_with('^') && !term.starts_with("\\b");
        let source = if wrap {
            format!(r"\b(?:{})\b", term)
        } else {
            term.to_string()
        };
        match build(&source, options.case_sensitive) {
            Ok(regex) => {
                return Some(Matcher {
                    regex,
                    literal_fallback: false,
                })
            }
            Err(err) => {
                warn!(term = %term, error = %err, "invalid regex, matching literally");
            }
        }
    }

    let escaped = regex::escape(term);
    let source = if options.whole_word {
        format!(r"\b{}\b", escaped)
    } else {
        escaped
    };
    // An escaped literal always compiles; the only failure left is the size limit.
    match build(&source, options.case_sensitive) {
        Ok(regex) => Some(Matcher {
            regex,
            literal_fallback: options.use_regex,
        }),
        Err(err) => {
            warn!(term = %term, error = %err, "term could not be compiled");
            None
        }
    }
}

fn build(source: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .case_insensitive(!case_sensitive)
        .build()
}
