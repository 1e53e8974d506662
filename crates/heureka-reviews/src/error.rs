use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the feed clients.
///
/// Only conditions that abort a whole run appear here. A single malformed
/// feed entry is never an error: the entry is skipped and scanning continues.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed endpoint answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// `run()` or `download()` was called before a source address was set.
    #[error("source address has not been set, can not download feed")]
    MissingSource,

    /// A feed file could not be opened or read.
    #[error("feed file {path:?} is not readable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while scanning the feed stream.
    #[error("error reading feed stream: {0}")]
    Stream(quick_xml::Error),

    /// The temp file could not be written or cleaned up.
    #[error("temp file {path:?} could not be written or removed: {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
