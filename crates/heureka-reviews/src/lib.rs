//! Client library for the Heureka.cz customer-review XML feeds.
//!
//! Two feed flavors share one streaming pipeline:
//!
//! - [`EshopReviewsClient`]: reviews of the shop itself, one record per
//!   `<review>` element;
//! - [`ProductReviewsClient`]: reviews of individual products, one record
//!   per `<product>` element, with optional per-product rolling summaries
//!   keyed by a caller-supplied identity resolver.
//!
//! The feed is scanned forward-only, one entry at a time; a malformed entry
//! is skipped silently and never aborts the run. Ratings are nullable: an
//! absent rating element stays `None` and is never coerced to `0.0`.
//!
//! ```no_run
//! use std::ops::ControlFlow;
//! use heureka_reviews::ProductReviewsClient;
//!
//! # async fn demo() -> Result<(), heureka_reviews::FeedError> {
//! let mut client: ProductReviewsClient<String> =
//!     ProductReviewsClient::new("0123456789abcdef0123456789abcdef", None);
//! client.set_id_resolver(|review| Some(review.product_number.clone()));
//! client.set_save_summary(true, false);
//! client.run().await?;
//!
//! for (id, summary) in client.all_summaries() {
//!     println!("{id}: {} reviews, avg {}", summary.review_count, summary.average_rating);
//! }
//! # Ok(())
//! # }
//! ```

mod aggregate;
pub mod error;
pub mod eshop;
mod parse;
mod pipeline;
pub mod product;
mod resolve;
mod scan;
mod source;
pub mod types;

pub use error::FeedError;
pub use eshop::EshopReviewsClient;
pub use pipeline::RecordCallback;
pub use product::ProductReviewsClient;
pub use resolve::IdResolver;
pub use types::{EshopReview, ProductReview, ProductReviewSummary};
