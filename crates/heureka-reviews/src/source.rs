//! Feed-source state machine shared by both clients.
//!
//! A source is either still to be fetched (an address, optionally with a
//! temp file to download into) or already fetched (an in-memory body or a
//! readable file). The explicit [`FetchState`] replaces the original
//! consumer's pair of "download finished" / "temp file set" flags.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::FeedError;

/// Fixed transport policy: the vendor endpoint is slow but well-behaved.
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("heureka-reviews/", env!("CARGO_PKG_VERSION"));

/// Where the feed content currently lives.
#[derive(Debug)]
pub(crate) enum FetchedSource {
    /// Whole feed body held in memory.
    Memory(String),
    /// Feed body in a readable file. `temp` marks files this crate
    /// downloaded itself and may delete after a run.
    File { path: PathBuf, temp: bool },
}

#[derive(Debug)]
pub(crate) enum FetchState {
    NotFetched,
    Fetched(FetchedSource),
}

/// Source configuration plus fetch state for one client.
pub(crate) struct FeedSource {
    address: Option<String>,
    temp_file: Option<PathBuf>,
    delete_temp_file: bool,
    state: FetchState,
}

impl FeedSource {
    pub fn new() -> Self {
        Self {
            address: None,
            temp_file: None,
            delete_temp_file: true,
            state: FetchState::NotFetched,
        }
    }

    pub fn set_address(&mut self, address: String) {
        self.address = Some(address);
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Downloads will land in `path` instead of memory. Using a temp file
    /// keeps peak memory at one fragment rather than the whole feed.
    pub fn set_temp_file(&mut self, path: impl Into<PathBuf>, delete_after_run: bool) {
        self.temp_file = Some(path.into());
        self.delete_temp_file = delete_after_run;
        self.state = FetchState::NotFetched;
    }

    /// Adopts an already-downloaded feed file. The file is never deleted.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Io`] when the file cannot be opened for reading.
    pub fn use_file(&mut self, path: impl Into<PathBuf>) -> Result<(), FeedError> {
        let path = path.into();
        std::fs::File::open(&path).map_err(|source| FeedError::Io {
            path: path.clone(),
            source,
        })?;
        self.delete_temp_file = false;
        self.state = FetchState::Fetched(FetchedSource::File { path, temp: false });
        Ok(())
    }

    /// Adopts an in-memory feed body directly, skipping the download.
    pub fn use_content(&mut self, xml: String) {
        self.state = FetchState::Fetched(FetchedSource::Memory(xml));
    }

    /// Fetches the feed from the configured address into the temp file or
    /// into memory, replacing whatever was fetched before.
    ///
    /// # Errors
    ///
    /// - [`FeedError::MissingSource`] when no address is configured.
    /// - [`FeedError::Http`] / [`FeedError::UnexpectedStatus`] on transport
    ///   failure or a non-2xx answer.
    /// - [`FeedError::TempFile`] when the temp file could not be written.
    pub async fn download(&mut self) -> Result<(), FeedError> {
        let address = self.address.clone().ok_or(FeedError::MissingSource)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        let response = client.get(&address).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: address,
            });
        }

        let body = response.text().await?;
        tracing::debug!(url = %address, bytes = body.len(), "feed downloaded");

        match self.temp_file.clone() {
            Some(path) => {
                tokio::fs::write(&path, &body)
                    .await
                    .map_err(|source| FeedError::TempFile {
                        path: path.clone(),
                        source,
                    })?;
                self.state = FetchState::Fetched(FetchedSource::File { path, temp: true });
            }
            None => {
                self.state = FetchState::Fetched(FetchedSource::Memory(body));
            }
        }
        Ok(())
    }

    /// Downloads unless a fetched source is already present, then hands it
    /// out for processing.
    ///
    /// # Errors
    ///
    /// Propagates [`FeedSource::download`] errors.
    pub async fn ensure_fetched(&mut self) -> Result<&FetchedSource, FeedError> {
        if matches!(self.state, FetchState::NotFetched) {
            self.download().await?;
        }
        match &self.state {
            FetchState::Fetched(fetched) => Ok(fetched),
            FetchState::NotFetched => Err(FeedError::MissingSource),
        }
    }

    /// Removes a downloaded temp file after a completed run, dropping back
    /// to `NotFetched` so a later run re-downloads.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::TempFile`] when the file exists but cannot be
    /// removed.
    pub async fn cleanup(&mut self) -> Result<(), FeedError> {
        if !self.delete_temp_file {
            return Ok(());
        }
        if let FetchState::Fetched(FetchedSource::File { path, temp: true }) = &self.state {
            let path = path.clone();
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|source| FeedError::TempFile {
                        path: path.clone(),
                        source,
                    })?;
                tracing::debug!(path = %path.display(), "temp file removed");
            }
            self.state = FetchState::NotFetched;
        }
        Ok(())
    }
}

impl FetchedSource {
    /// Opens the fetched content for one forward scan.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Io`] when a file-backed source cannot be opened.
    pub fn open(&self) -> Result<Box<dyn BufRead + '_>, FeedError> {
        match self {
            Self::Memory(body) => Ok(Box::new(body.as_bytes())),
            Self::File { path, .. } => {
                let file = std::fs::File::open(path).map_err(|source| FeedError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }

    /// Whether the body starts with `marker` (ignoring leading whitespace).
    /// The vendor answers some product-feed requests with a plain-text
    /// `INFO: No product reviews` line instead of XML.
    pub fn starts_with(&self, marker: &str) -> Result<bool, FeedError> {
        match self {
            Self::Memory(body) => Ok(body.trim_start().starts_with(marker)),
            Self::File { path, .. } => {
                let mut file = std::fs::File::open(path).map_err(|source| FeedError::Io {
                    path: path.clone(),
                    source,
                })?;
                let mut head = vec![0u8; marker.len() + 16];
                let read = file.read(&mut head).map_err(|source| FeedError::Io {
                    path: path.clone(),
                    source,
                })?;
                head.truncate(read);
                Ok(String::from_utf8_lossy(&head).trim_start().starts_with(marker))
            }
        }
    }
}
