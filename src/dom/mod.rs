//! In-memory document tree.
//!
//! Pages are parsed with `scraper` (html5ever) and copied into an arena of
//! nodes addressed by [`NodeId`]. The highlighter mutates this tree through
//! the [`TextTreeEditor`] trait; the reader only ever reads it.

pub mod editor;
pub mod parse;
pub mod selector;
pub mod serialize;
pub mod tree;

pub use editor::{TextTreeEditor, WrappedRange};
pub use selector::SelectorIndex;
pub use tree::{Document, ElementData, NodeData, NodeId};
