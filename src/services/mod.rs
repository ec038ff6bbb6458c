// pagemark services
// Services hold no page state: pattern compilation, text scanning, the highlight
// engine, readable-content extraction, Markdown export and preferences.

pub mod highlight_engine;
pub mod markdown_export;
pub mod pattern_compiler;
pub mod preferences_engine;
pub mod reader_mode;
pub mod text_scanner;
