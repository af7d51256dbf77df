//! # Templates
//!
//! Exposes the prompt and page templates from the `templates/` and `static/` directories.

pub const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("../../templates/system_prompt.md");
pub const INDEX_HTML: &str = include_str!("../../templates/index.html");
pub const CHAT_JS: &str = include_str!("../../static/js/chat.js");
