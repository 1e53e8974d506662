//! Client for the shop-review feed (`export-review.php`).

use regex::Regex;

use crate::error::FeedError;
use crate::parse::Element;
use crate::pipeline::{run_feed, FeedVariant, RecordCallback};
use crate::source::FeedSource;
use crate::types::EshopReview;

const EXPORT_URL: &str = "http://www.heureka.cz/direct/dotaznik/export-review.php?key=";

/// Returns `true` when `key` looks like a raw 32-character Heureka key
/// rather than a full feed URL.
pub(crate) fn is_raw_key(key: &str) -> bool {
    let re = Regex::new(r"^\w{32}$").expect("valid key regex");
    re.is_match(key)
}

/// Downloads and streams the shop-review feed, producing one
/// [`EshopReview`] per well-formed `<review>` element.
///
/// ```no_run
/// use std::ops::ControlFlow;
/// use heureka_reviews::EshopReviewsClient;
///
/// # async fn demo() -> Result<(), heureka_reviews::FeedError> {
/// let mut client = EshopReviewsClient::new("0123456789abcdef0123456789abcdef");
/// client.set_callback(|review| {
///     println!("{}: {:?}", review.author, review.rating_total);
///     ControlFlow::Continue(())
/// });
/// client.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct EshopReviewsClient {
    source: FeedSource,
    callback: Option<RecordCallback<EshopReview>>,
}

impl EshopReviewsClient {
    /// Creates a client for the given Heureka key or full feed URL.
    #[must_use]
    pub fn new(key: &str) -> Self {
        let mut client = Self::unconfigured();
        client.set_key(key);
        client
    }

    /// Creates a client with no source; configure one with
    /// [`set_key`](Self::set_key), [`use_file`](Self::use_file) or
    /// [`use_content`](Self::use_content) before running.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            source: FeedSource::new(),
            callback: None,
        }
    }

    /// Sets the feed source: a 32-character Heureka key expands to the
    /// vendor export URL, anything else is taken as a full URL.
    pub fn set_key(&mut self, key: &str) {
        if is_raw_key(key) {
            self.source.set_address(format!("{EXPORT_URL}{key}"));
        } else {
            self.source.set_address(key.to_owned());
        }
    }

    /// The currently configured feed URL, if any.
    #[must_use]
    pub fn source_address(&self) -> Option<&str> {
        self.source.address()
    }

    /// Routes the download through a temp file instead of memory, keeping
    /// peak memory at one feed entry. The file is removed after a completed
    /// run when `delete_after_run` is set; the next run downloads again.
    pub fn set_temp_file(&mut self, path: impl Into<std::path::PathBuf>, delete_after_run: bool) {
        self.source.set_temp_file(path, delete_after_run);
    }

    /// Processes an already-downloaded feed file instead of fetching.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Io`] when the file is not readable.
    pub fn use_file(&mut self, path: impl Into<std::path::PathBuf>) -> Result<(), FeedError> {
        self.source.use_file(path)
    }

    /// Processes an in-memory feed body instead of fetching.
    pub fn use_content(&mut self, xml: impl Into<String>) {
        self.source.use_content(xml.into());
    }

    /// Registers the per-record callback, invoked synchronously in feed
    /// order. Return [`ControlFlow::Break`](std::ops::ControlFlow::Break)
    /// to stop the pass early.
    pub fn set_callback(
        &mut self,
        callback: impl FnMut(&EshopReview) -> std::ops::ControlFlow<()> + 'static,
    ) {
        self.callback = Some(Box::new(callback));
    }

    /// Downloads the feed now without processing it.
    ///
    /// # Errors
    ///
    /// Propagates download errors; see [`FeedError`].
    pub async fn download(&mut self) -> Result<(), FeedError> {
        self.source.download().await
    }

    /// Runs one import pass: download (unless already fetched), stream all
    /// `<review>` elements through the callback, clean up the temp file.
    /// Returns the number of records produced.
    ///
    /// # Errors
    ///
    /// Fatal conditions only: missing source, transport failure, unreadable
    /// file or stream, temp-file cleanup failure. Malformed feed entries
    /// are skipped, never reported.
    pub async fn run(&mut self) -> Result<usize, FeedError> {
        let count = {
            let fetched = self.source.ensure_fetched().await?;
            let reader = fetched.open()?;
            run_feed(reader, &mut EshopMapper, self.callback.as_mut())?
        };
        self.source.cleanup().await?;
        Ok(count)
    }
}

/// Field mapping for one `<review>` element of the shop feed.
struct EshopMapper;

impl FeedVariant for EshopMapper {
    type Record = EshopReview;

    fn node_name(&self) -> &'static str {
        "review"
    }

    fn map(&mut self, element: &Element, index: usize) -> EshopReview {
        EshopReview {
            index,
            rating_id: element.i64_of("rating_id"),
            author: element.text_of("name"),
            date: crate::parse::epoch_to_utc(element.i64_of("unix_timestamp")),
            rating_total: element.rating_of("total_rating"),
            rating_delivery: element.rating_of("delivery_time"),
            rating_transport_quality: element.rating_of("transport_quality"),
            rating_web_usability: element.rating_of("web_usability"),
            rating_communication: element.rating_of("communication"),
            pros: element.text_of("pros"),
            cons: element.text_of("cons"),
            summary: element.text_of("summary"),
            reaction: element.text_of("reaction"),
            order_id: element.text_of("order_id"),
        }
    }
}
