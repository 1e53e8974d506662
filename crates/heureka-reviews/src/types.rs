//! Typed records produced from the Heureka review feeds.
//!
//! One [`EshopReview`] is produced per `<review>` element of the shop feed;
//! one [`ProductReview`] per `<product>` element of the product feed. All
//! star ratings use the Heureka 0.5–5.0 scale, and a missing rating element
//! maps to `None` rather than `0.0`, which would be indistinguishable from a
//! rating the scale cannot actually produce.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One customer review of the shop itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EshopReview {
    /// Position within the feed, counting successfully produced records
    /// from 0. Skipped (malformed) entries do not advance it.
    pub index: usize,
    /// Review id assigned by Heureka.
    pub rating_id: i64,
    /// Author name; empty string means an anonymous review.
    pub author: String,
    /// When the review was written.
    pub date: DateTime<Utc>,
    /// Overall rating.
    pub rating_total: Option<f64>,
    /// Delivery-time rating.
    pub rating_delivery: Option<f64>,
    /// Shipment-quality rating.
    pub rating_transport_quality: Option<f64>,
    /// Site-usability rating.
    pub rating_web_usability: Option<f64>,
    /// Merchant-communication rating.
    pub rating_communication: Option<f64>,
    /// Main advantages, usually one point per line.
    pub pros: String,
    /// Main disadvantages, usually one point per line.
    pub cons: String,
    /// Free-text overall opinion.
    pub summary: String,
    /// Merchant's public reaction to the review.
    pub reaction: String,
    /// Order the customer reviewed.
    pub order_id: String,
}

/// One customer review of a specific product.
///
/// Product-level fields come from the outer `<product>` element; the
/// review-level fields from the single nested `<reviews><review>` element.
/// `I` is the caller-defined product identity produced by the id resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReview<I> {
    /// Position within the feed, counting successfully produced records
    /// from 0. Skipped (malformed) entries do not advance it.
    pub index: usize,
    /// Review id assigned by Heureka.
    pub rating_id: i64,
    /// Author name; empty string means an anonymous review.
    pub author: String,
    /// When the review was written.
    pub date: DateTime<Utc>,
    /// Product rating, or `None` when the customer left no stars.
    pub rating: Option<f64>,
    /// Main advantages, usually one point per line.
    pub pros: String,
    /// Main disadvantages, usually one point per line.
    pub cons: String,
    /// Free-text overall opinion.
    pub summary: String,
    /// Order the customer reviewed.
    pub order_id: String,
    /// Resolved product identity. `None` when no resolver is configured or
    /// the resolver did not recognize the product.
    pub product_id: Option<I>,
    /// Product name as listed in the feed.
    pub product_name: String,
    /// Product URL in the merchant's shop.
    pub product_url: String,
    /// Product price (without VAT).
    pub product_price: f64,
    /// Product EAN.
    pub product_ean: String,
    /// Merchant's product number.
    pub product_number: String,
}

/// Rolling aggregate over all reviews of one resolved product.
///
/// Created when the first review naming the identity is folded in and
/// mutated incrementally afterwards; see
/// [`ProductReviewsClient::set_save_summary`](crate::ProductReviewsClient::set_save_summary).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReviewSummary<I> {
    /// The resolved product identity this summary belongs to.
    pub product_id: I,
    /// Number of reviews folded in, rated or not.
    pub review_count: u32,
    /// Number of folded reviews that carried a rating.
    pub rating_count: u32,
    /// Running average rating, rounded to one decimal place. `0.0` until
    /// the first rated review arrives.
    pub average_rating: f64,
    /// Sum of all stars given.
    pub total_stars: f64,
    /// Best rating seen so far. Starts at the `0.0` sentinel.
    pub best_rating: f64,
    /// Worst rating seen so far. Starts at the `0.0` sentinel.
    pub worst_rating: f64,
    /// Date of the oldest folded review.
    pub oldest_review_date: Option<DateTime<Utc>>,
    /// Date of the newest folded review.
    pub newest_review_date: Option<DateTime<Utc>>,
    /// The folded reviews in arrival order. Stays empty unless grouped
    /// reviews are enabled.
    pub reviews: Vec<ProductReview<I>>,
}

impl<I> ProductReviewSummary<I> {
    pub(crate) fn new(product_id: I) -> Self {
        Self {
            product_id,
            review_count: 0,
            rating_count: 0,
            average_rating: 0.0,
            total_stars: 0.0,
            best_rating: 0.0,
            worst_rating: 0.0,
            oldest_review_date: None,
            newest_review_date: None,
            reviews: Vec::new(),
        }
    }
}
