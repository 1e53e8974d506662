//! Client for the product-review feed (`export-product-review.php`).
//!
//! On top of the shared pipeline this client resolves each review to a
//! caller-defined product identity (memoized per run, see
//! [`crate::resolve`]) and optionally maintains per-product rolling
//! summaries.

use std::hash::Hash;
use std::ops::ControlFlow;

use chrono::NaiveDateTime;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::aggregate::SummaryStore;
use crate::error::FeedError;
use crate::eshop::is_raw_key;
use crate::parse::Element;
use crate::pipeline::{run_feed, FeedVariant, RecordCallback};
use crate::resolve::{IdResolver, ResolverCache};
use crate::source::FeedSource;
use crate::types::{ProductReview, ProductReviewSummary};

const EXPORT_URL: &str = "https://www.heureka.cz/direct/dotaznik/export-product-review.php?key=";

/// Plain-text body the vendor sends instead of XML when the key has no
/// product reviews yet. Treated as an empty feed, not an error.
const EMPTY_FEED_MARKER: &str = "INFO: No product reviews";

/// Downloads and streams the product-review feed, producing one
/// [`ProductReview`] per well-formed `<product>` element.
///
/// `I` is the caller's product-identity type, supplied by the id resolver;
/// summaries are keyed by it when aggregation is enabled via
/// [`set_save_summary`](Self::set_save_summary).
pub struct ProductReviewsClient<I> {
    source: FeedSource,
    callback: Option<RecordCallback<ProductReview<I>>>,
    resolver: Option<IdResolver<I>>,
    cache: ResolverCache<I>,
    summaries: SummaryStore<I>,
}

impl<I: Clone + Eq + Hash> ProductReviewsClient<I> {
    /// Creates a client for the given Heureka key or full feed URL.
    /// `from` optionally bounds how far back reviews are fetched (the
    /// vendor honors at most six months); it only applies when `key` is a
    /// raw key rather than a full URL.
    #[must_use]
    pub fn new(key: &str, from: Option<NaiveDateTime>) -> Self {
        let mut client = Self::unconfigured();
        client.set_key(key, from);
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
            resolver: None,
            cache: ResolverCache::new(),
            summaries: SummaryStore::new(),
        }
    }

    /// Sets the feed source: a 32-character Heureka key expands to the
    /// vendor export URL (with an optional percent-encoded `from` bound),
    /// anything else is taken as a full URL.
    pub fn set_key(&mut self, key: &str, from: Option<NaiveDateTime>) {
        if is_raw_key(key) {
            let mut address = format!("{EXPORT_URL}{key}");
            if let Some(from) = from {
                let formatted = from.format("%Y-%m-%d %H:%M:%S").to_string();
                let encoded = utf8_percent_encode(&formatted, NON_ALPHANUMERIC);
                address.push_str(&format!("&from={encoded}"));
            }
            self.source.set_address(address);
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
    /// order. Return [`ControlFlow::Break`] to stop the pass early.
    pub fn set_callback(
        &mut self,
        callback: impl FnMut(&ProductReview<I>) -> ControlFlow<()> + 'static,
    ) {
        self.callback = Some(Box::new(callback));
    }

    /// Registers the function that maps a review's product-descriptive
    /// fields to the shop's own product identity. Summaries only work when
    /// a resolver is set; without one every review resolves to `None`.
    pub fn set_id_resolver(&mut self, resolver: impl Fn(&ProductReview<I>) -> Option<I> + 'static) {
        self.resolver = Some(Box::new(resolver));
    }

    /// Enables per-product summaries for the next run. With `grouped` set,
    /// each summary also retains its reviews in arrival order; otherwise
    /// the review lists stay empty.
    pub fn set_save_summary(&mut self, enabled: bool, grouped: bool) {
        self.summaries.configure(enabled, grouped);
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
    /// `<product>` elements through resolution, aggregation and the
    /// callback, clean up the temp file. Returns the number of records
    /// produced.
    ///
    /// The resolver cache and all summaries are reset before scanning, so
    /// the state afterwards reflects this pass alone.
    ///
    /// # Errors
    ///
    /// Fatal conditions only: missing source, transport failure, unreadable
    /// file or stream, temp-file cleanup failure. Malformed feed entries
    /// are skipped, never reported.
    pub async fn run(&mut self) -> Result<usize, FeedError> {
        self.cache.reset();
        self.summaries.reset();

        let count = {
            let fetched = self.source.ensure_fetched().await?;
            if fetched.starts_with(EMPTY_FEED_MARKER)? {
                tracing::debug!("vendor reported an empty product-review feed");
                0
            } else {
                let reader = fetched.open()?;
                let mut mapper = ProductMapper {
                    resolver: self.resolver.as_ref(),
                    cache: &mut self.cache,
                    summaries: &mut self.summaries,
                };
                run_feed(reader, &mut mapper, self.callback.as_mut())?
            }
        };

        self.source.cleanup().await?;
        Ok(count)
    }

    /// Identities of every product seen in the last run, in no particular
    /// order.
    #[must_use]
    pub fn all_product_ids(&self) -> Vec<I> {
        self.summaries.product_ids()
    }

    /// All summaries of the last run, keyed by product identity.
    #[must_use]
    pub fn all_summaries(&self) -> &std::collections::HashMap<I, ProductReviewSummary<I>> {
        self.summaries.all()
    }

    /// Summary for one product, or `None` when no review resolved to it.
    #[must_use]
    pub fn summary_of_product(&self, product_id: &I) -> Option<&ProductReviewSummary<I>> {
        self.summaries.get(product_id)
    }

    /// Grouped reviews of one product; empty when the product was not seen
    /// or grouping was disabled.
    #[must_use]
    pub fn reviews_of_product(&self, product_id: &I) -> &[ProductReview<I>] {
        self.summaries.reviews_of(product_id)
    }
}

/// Field mapping for one `<product>` element: product fields from the
/// outer element, review fields from the single nested
/// `<reviews><review>` element, then identity resolution and aggregation.
struct ProductMapper<'a, I> {
    resolver: Option<&'a IdResolver<I>>,
    cache: &'a mut ResolverCache<I>,
    summaries: &'a mut SummaryStore<I>,
}

impl<I: Clone + Eq + Hash> FeedVariant for ProductMapper<'_, I> {
    type Record = ProductReview<I>;

    fn node_name(&self) -> &'static str {
        "product"
    }

    fn map(&mut self, element: &Element, index: usize) -> ProductReview<I> {
        let review_element = element.child("reviews").and_then(|r| r.child("review"));

        let mut review = ProductReview {
            index,
            rating_id: review_element.map_or(0, |r| r.i64_of("rating_id")),
            author: review_element.map(|r| r.text_of("name")).unwrap_or_default(),
            date: crate::parse::epoch_to_utc(
                review_element.map_or(0, |r| r.i64_of("unix_timestamp")),
            ),
            rating: review_element.and_then(|r| r.rating_of("rating")),
            pros: review_element.map(|r| r.text_of("pros")).unwrap_or_default(),
            cons: review_element.map(|r| r.text_of("cons")).unwrap_or_default(),
            summary: review_element
                .map(|r| r.text_of("summary"))
                .unwrap_or_default(),
            order_id: element.text_of("order_id"),
            product_id: None,
            product_name: element.text_of("product_name"),
            product_url: element.text_of("url"),
            product_price: element.f64_of("price"),
            product_ean: element.text_of("ean"),
            product_number: element.text_of("productno"),
        };

        let product_id = self.cache.resolve(self.resolver, &review);
        review.product_id = product_id.clone();
        if let Some(id) = product_id {
            self.summaries.fold(&id, &review);
        }

        review
    }
}
