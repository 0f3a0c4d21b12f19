//! Prompt to canned-response mapping.
//!
//! The table is scanned in its defined order and the first keyword found in the
//! lower-cased prompt wins. Prompts that match nothing get the default text.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::prompt::Prompt;

pub const DEFAULT_KEY: &str = "default";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const GENERATED_AT_PREFIX: &str = "Generated at ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub keyword: String,
    pub text: String,
}

impl ResponseEntry {
    pub fn new(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
        }
    }
}

/// Ordered keyword table plus the fallback text. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTable {
    entries: Vec<ResponseEntry>,
    default_text: String,
}

impl ResponseTable {
    /// Builds a table, lower-casing keywords and dropping blank ones.
    ///
    /// An entry keyed `default` is not matchable; it replaces `default_text`.
    pub fn new(entries: Vec<ResponseEntry>, default_text: impl Into<String>) -> Self {
        let mut default_text = default_text.into();
        let mut normalized = Vec::with_capacity(entries.len());

        for entry in entries {
            let keyword = entry.keyword.trim().to_lowercase();
            if keyword == DEFAULT_KEY {
                default_text = entry.text;
                continue;
            }
            if keyword.is_empty() {
                log::warn!("Ignoring response entry with a blank keyword");
                continue;
            }
            normalized.push(ResponseEntry {
                keyword,
                text: entry.text,
            });
        }

        Self {
            entries: normalized,
            default_text,
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            vec![
                ResponseEntry::new(
                    "hello",
                    "Hello there! I'm a simulated assistant. Every character you see is being \
                     streamed to you one at a time, just like a real model would type it out.",
                ),
                ResponseEntry::new(
                    "javascript",
                    "JavaScript is the language of the web. It runs in every browser, powers \
                     servers through Node.js, and its event loop makes asynchronous I/O feel natural.",
                ),
                ResponseEntry::new(
                    "python",
                    "Python favors readability above almost everything else. It is a common \
                     choice for scripting, data analysis, and machine learning work.",
                ),
                ResponseEntry::new(
                    "rust",
                    "Rust gives you memory safety without a garbage collector. Ownership and \
                     borrowing let the compiler catch whole classes of bugs before your code runs.",
                ),
                ResponseEntry::new(
                    "stream",
                    "Streaming responses are delivered with Server-Sent Events. The connection \
                     stays open and each character is pushed as its own event on a fixed cadence.",
                ),
            ],
            "That's an interesting question! This demo returns canned answers, so try asking \
             about JavaScript, Python, Rust, or streaming to see a different response.",
        )
    }

    pub fn entries(&self) -> &[ResponseEntry] {
        &self.entries
    }

    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    /// First entry whose keyword occurs in the prompt, case-insensitively.
    pub fn lookup(&self, prompt: &str) -> Option<&ResponseEntry> {
        let lowered = prompt.to_lowercase();
        self.entries
            .iter()
            .find(|entry| lowered.contains(entry.keyword.as_str()))
    }
}

impl Default for ResponseTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Full text for one stream: echo, selected body, generation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    text: String,
    keyword: Option<String>,
}

impl RenderedResponse {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Keyword that selected the body, `None` when the default was used.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct ResponseSelector {
    table: Arc<ResponseTable>,
}

impl ResponseSelector {
    pub fn new(table: Arc<ResponseTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ResponseTable {
        &self.table
    }

    pub fn render(&self, prompt: &Prompt) -> RenderedResponse {
        self.render_at(prompt, Local::now())
    }

    pub fn render_at(&self, prompt: &Prompt, generated_at: DateTime<Local>) -> RenderedResponse {
        let (keyword, body) = match self.table.lookup(prompt.as_str()) {
            Some(entry) => (Some(entry.keyword.clone()), entry.text.as_str()),
            None => (None, self.table.default_text()),
        };

        let text = format!(
            "You asked: \"{}\"\n\n{}\n\n{}{}",
            prompt.as_str(),
            body,
            GENERATED_AT_PREFIX,
            generated_at.format(TIMESTAMP_FORMAT)
        );

        RenderedResponse { text, keyword }
    }
}
