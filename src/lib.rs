//! Core library for Wiktionary maintenance bots: a round-trip-exact
//! wikitext template model, parameter-chain helpers, a language section
//! splitter, and a batch edit driver that works against the live wiki,
//! an XML dump on stdin, or an in-memory store in tests.

pub mod chain;
pub mod document;
pub mod dump;
pub mod error;
pub mod fixlog;
pub mod language;
pub mod links;
pub mod mediawiki;
pub mod orchestrator;
pub mod scanner;
pub mod section;
pub mod store;
pub mod template;

pub use chain::{append_to_chain, fetch_chain, remove_chain, set_chain, HolePolicy};
pub use document::{Document, Node};
pub use error::{BotError, ChainError, ParseError, ScanError, SplitError, StoreError};
pub use orchestrator::{run_batch, BotArgs, Outcome};
pub use section::{find_modifiable_section, split_into_sections, split_into_subsections};
pub use store::{MemoryStore, PageStore};
pub use template::Template;

use error::StoreError as PageSourceError;

/// One page pulled from an XML dump.
#[derive(Debug, Default)]
pub struct Page {
    pub title: String,
    pub ns: Option<i32>,
    pub id: Option<i32>,
    pub rev_id: Option<i32>,
    pub rev_text: String,
}

impl Page {
    pub fn new() -> Self {
        Page::default()
    }

    pub fn is_main_namespace(&self) -> bool {
        self.ns == Some(0)
    }
}

/// A stream of pages, typically a dump reader.
pub trait PageSource {
    fn next_page(&mut self) -> Result<Option<Page>, PageSourceError>;
}
