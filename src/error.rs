//! Error types for the bot library.
//!
//! Everything page-local (scan, parse, chain, split) is a typed enum so the
//! batch driver can decide per-variant whether to skip the page or abort the
//! whole run. `BotError` is the umbrella type returned by per-page transforms.

use thiserror::Error;

/// Error from the balanced-delimiter scanner. Carries the offending delimiter
/// and its byte position so a warning can point at the exact spot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unmatched open delimiter {delim:?} at byte {pos}")]
    UnmatchedOpen { delim: String, pos: usize },

    #[error("unmatched close delimiter {delim:?} at byte {pos}")]
    UnmatchedClose { delim: String, pos: usize },

    #[error("close delimiter {found:?} at byte {pos} does not match open {expected:?}")]
    MismatchedClose {
        found: String,
        expected: String,
        pos: usize,
    },
}

/// Error from the document parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("template has no name: {snippet:?}")]
    EmptyTemplateName { snippet: String },
}

/// Error from the parameter-chain utility.
///
/// `EmptyKey` and `EmptyPrefix` indicate a bug in the calling transform, not a
/// data condition, and are propagated out of the batch rather than skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain key name is empty")]
    EmptyKey,

    #[error("chain prefix is empty")]
    EmptyPrefix,

    #[error("more than one chain alias is populated: {keys:?}")]
    AliasConflict { keys: Vec<String> },

    #[error("chain key {key:?} implies position {position}, past the supported maximum")]
    PositionOutOfRange { key: String, position: usize },

    #[error("hole at chain position {position}")]
    Hole { position: usize },
}

/// Error from the section splitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("no {language:?} section found")]
    LanguageNotFound { language: String },
}

/// Error from a page store backend (remote wiki or XML dump).
///
/// `Transient` is the only retryable variant; everything else is permanent
/// for the affected page.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("page {title:?} does not exist")]
    NotFound { title: String },

    #[error("permission denied saving {title:?}")]
    PermissionDenied { title: String },

    #[error("title {title:?} is blacklisted")]
    TitleBlacklisted { title: String },

    #[error("page {title:?} is locked")]
    Locked { title: String },

    #[error("save of {title:?} failed: {message}")]
    Save { title: String, message: String },

    #[error("transient backend error: {message}")]
    Transient { message: String },

    #[error("malformed backend response: {message}")]
    BadResponse { message: String },

    #[error("dump read error: {message}")]
    Dump { message: String },

    #[error("no page store configured for this run")]
    NoStore,
}

/// Umbrella error for the per-page transform boundary.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

impl BotError {
    /// Whether this error indicates a bug in the calling transform rather
    /// than a condition of the page data. Bugs abort the batch; data
    /// conditions skip the page.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            BotError::Chain(ChainError::EmptyKey) | BotError::Chain(ChainError::EmptyPrefix)
        )
    }
}
