//! Incremental per-product review summaries.
//!
//! One [`ProductReviewSummary`] per distinct resolved identity, created on
//! first sight and mutated as further reviews arrive. Summaries are scoped
//! to one parse run; [`SummaryStore::reset`] runs before every pass.
//!
//! Best/worst extrema keep the feed's historical comparison: the stored
//! value starts at `0.0` and an update fires when the stored value is still
//! `0.0` or the strict comparison holds. Real ratings floor at 0.5, so the
//! sentinel is unreachable through well-formed data, but a wire value of
//! exactly `0.0` counts toward the totals without ever registering as an
//! extremum. See `zero_rating_never_becomes_extremum` below.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{ProductReview, ProductReviewSummary};

/// Holds all summaries of one parse run, keyed by resolved identity.
pub(crate) struct SummaryStore<I> {
    enabled: bool,
    grouped: bool,
    summaries: HashMap<I, ProductReviewSummary<I>>,
}

impl<I: Clone + Eq + Hash> SummaryStore<I> {
    pub fn new() -> Self {
        Self {
            enabled: false,
            grouped: false,
            summaries: HashMap::new(),
        }
    }

    pub fn configure(&mut self, enabled: bool, grouped: bool) {
        self.enabled = enabled;
        self.grouped = grouped;
    }

    /// Drops all summaries from the previous pass.
    pub fn reset(&mut self) {
        self.summaries.clear();
    }

    /// Folds one review into the summary for `product_id`.
    ///
    /// No-op when summaries are disabled. Counters always advance; the
    /// rating-dependent fields only when the review carries a rating.
    pub fn fold(&mut self, product_id: &I, review: &ProductReview<I>) {
        if !self.enabled {
            return;
        }

        let summary = self
            .summaries
            .entry(product_id.clone())
            .or_insert_with(|| ProductReviewSummary::new(product_id.clone()));

        summary.review_count += 1;

        if let Some(rating) = review.rating {
            summary.rating_count += 1;
            summary.total_stars += rating;
            summary.average_rating =
                (summary.total_stars / f64::from(summary.rating_count) * 10.0).round() / 10.0;

            if summary.best_rating == 0.0 || summary.best_rating < rating {
                summary.best_rating = rating;
            }
            if summary.worst_rating == 0.0 || summary.worst_rating > rating {
                summary.worst_rating = rating;
            }
        }

        if summary
            .newest_review_date
            .is_none_or(|newest| newest < review.date)
        {
            summary.newest_review_date = Some(review.date);
        }
        if summary
            .oldest_review_date
            .is_none_or(|oldest| oldest > review.date)
        {
            summary.oldest_review_date = Some(review.date);
        }

        if self.grouped {
            summary.reviews.push(review.clone());
        }
    }

    pub fn product_ids(&self) -> Vec<I> {
        self.summaries.keys().cloned().collect()
    }

    pub fn all(&self) -> &HashMap<I, ProductReviewSummary<I>> {
        &self.summaries
    }

    pub fn get(&self, product_id: &I) -> Option<&ProductReviewSummary<I>> {
        self.summaries.get(product_id)
    }

    pub fn reviews_of(&self, product_id: &I) -> &[ProductReview<I>] {
        self.summaries
            .get(product_id)
            .map_or(&[], |s| s.reviews.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::epoch_to_utc;

    fn rated(rating: Option<f64>, epoch: i64) -> ProductReview<&'static str> {
        ProductReview {
            index: 0,
            rating_id: 1,
            author: String::new(),
            date: epoch_to_utc(epoch),
            rating,
            pros: String::new(),
            cons: String::new(),
            summary: String::new(),
            order_id: String::new(),
            product_id: Some("p1"),
            product_name: "Kettle".to_owned(),
            product_url: String::new(),
            product_price: 100.0,
            product_ean: String::new(),
            product_number: String::new(),
        }
    }

    fn store() -> SummaryStore<&'static str> {
        let mut store = SummaryStore::new();
        store.configure(true, true);
        store
    }

    #[test]
    fn folds_counts_average_and_extrema() {
        let mut store = store();
        for (rating, epoch) in [(4.0, 100), (5.0, 200), (3.0, 300)] {
            store.fold(&"p1", &rated(Some(rating), epoch));
        }

        let summary = store.get(&"p1").expect("summary exists");
        assert_eq!(summary.review_count, 3);
        assert_eq!(summary.rating_count, 3);
        assert!((summary.average_rating - 4.0).abs() < f64::EPSILON);
        assert!((summary.total_stars - 12.0).abs() < f64::EPSILON);
        assert!((summary.best_rating - 5.0).abs() < f64::EPSILON);
        assert!((summary.worst_rating - 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.reviews.len(), 3);
    }

    #[test]
    fn unrated_review_advances_review_count_only() {
        let mut store = store();
        store.fold(&"p1", &rated(Some(4.0), 100));
        store.fold(&"p1", &rated(None, 200));

        let summary = store.get(&"p1").unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.rating_count, 1);
        assert!((summary.average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        let mut store = store();
        store.fold(&"p1", &rated(Some(4.0), 100));
        store.fold(&"p1", &rated(Some(4.5), 200));
        store.fold(&"p1", &rated(Some(5.0), 300));

        // 13.5 / 3 = 4.5 exactly; add one more for a repeating decimal.
        store.fold(&"p1", &rated(Some(4.0), 400));
        let summary = store.get(&"p1").unwrap();
        assert!((summary.average_rating - 4.4).abs() < f64::EPSILON);
    }

    #[test]
    fn first_rating_becomes_both_extrema() {
        let mut store = store();
        store.fold(&"p1", &rated(Some(2.5), 100));
        let summary = store.get(&"p1").unwrap();
        assert!((summary.best_rating - 2.5).abs() < f64::EPSILON);
        assert!((summary.worst_rating - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn date_extrema_ignore_arrival_order() {
        let mut store = store();
        for epoch in [500, 100, 900, 300] {
            store.fold(&"p1", &rated(None, epoch));
        }
        let summary = store.get(&"p1").unwrap();
        assert_eq!(summary.oldest_review_date, Some(epoch_to_utc(100)));
        assert_eq!(summary.newest_review_date, Some(epoch_to_utc(900)));
    }

    #[test]
    fn first_review_date_becomes_both_date_extrema() {
        let mut store = store();
        store.fold(&"p1", &rated(None, 250));
        let summary = store.get(&"p1").unwrap();
        assert_eq!(summary.oldest_review_date, Some(epoch_to_utc(250)));
        assert_eq!(summary.newest_review_date, Some(epoch_to_utc(250)));
    }

    #[test]
    fn grouping_disabled_keeps_review_list_empty() {
        let mut store = SummaryStore::new();
        store.configure(true, false);
        store.fold(&"p1", &rated(Some(4.0), 100));

        let summary = store.get(&"p1").unwrap();
        assert_eq!(summary.review_count, 1);
        assert!(summary.reviews.is_empty());
        assert!(store.reviews_of(&"p1").is_empty());
    }

    #[test]
    fn disabled_store_folds_nothing() {
        let mut store = SummaryStore::new();
        store.configure(false, true);
        store.fold(&"p1", &rated(Some(4.0), 100));
        assert!(store.all().is_empty());
    }

    #[test]
    fn distinct_identities_get_distinct_summaries() {
        let mut store = store();
        store.fold(&"p1", &rated(Some(4.0), 100));
        store.fold(&"p2", &rated(Some(2.0), 200));

        let mut ids = store.product_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(store.get(&"p2").unwrap().review_count, 1);
    }

    /// A wire rating of exactly 0.0 (impossible on the 0.5–5.0 scale, but
    /// expressible in the XML) counts toward the totals yet never registers
    /// as best or worst, because 0.0 is also the "unset" sentinel.
    #[test]
    fn zero_rating_never_becomes_extremum() {
        let mut store = store();
        store.fold(&"p1", &rated(Some(0.0), 100));

        let summary = store.get(&"p1").unwrap();
        assert_eq!(summary.rating_count, 1);
        assert!((summary.total_stars - 0.0).abs() < f64::EPSILON);
        // Extrema still read as the unset sentinel.
        assert!((summary.best_rating - 0.0).abs() < f64::EPSILON);
        assert!((summary.worst_rating - 0.0).abs() < f64::EPSILON);

        // A later real rating takes both slots as if it were the first.
        store.fold(&"p1", &rated(Some(3.0), 200));
        let summary = store.get(&"p1").unwrap();
        assert!((summary.best_rating - 3.0).abs() < f64::EPSILON);
        assert!((summary.worst_rating - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_drops_previous_pass_summaries() {
        let mut store = store();
        store.fold(&"p1", &rated(Some(4.0), 100));
        store.reset();
        assert!(store.all().is_empty());
        assert_eq!(store.get(&"p1"), None);
    }

    #[test]
    fn unseen_product_has_no_reviews() {
        let store: SummaryStore<&str> = SummaryStore::new();
        assert!(store.reviews_of(&"ghost").is_empty());
    }
}
