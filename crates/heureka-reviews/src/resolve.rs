//! Product-identity resolution with per-run memoization.
//!
//! The resolver is caller-supplied and may be expensive (typically a lookup
//! against the shop's own catalog), while the feed repeats the same product
//! over and over. Results are therefore memoized under a fingerprint of the
//! product's descriptive fields, so the resolver runs at most once per
//! distinct product per run, including when it answers `None`.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::types::ProductReview;

/// Caller-supplied function mapping a [`ProductReview`] to the shop's own
/// product identity. Returning `None` leaves the review unaggregated.
pub type IdResolver<I> = Box<dyn Fn(&ProductReview<I>) -> Option<I>>;

/// Memoization table for resolver results, valid for one parse run.
pub(crate) struct ResolverCache<I> {
    entries: HashMap<[u8; 32], Option<I>>,
}

impl<I: Clone> ResolverCache<I> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Drops all memoized results. Must run at the start of every parse
    /// pass so one run's identities never leak into the next.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Resolves the product identity for `review`.
    ///
    /// Without a resolver this is always `None` and nothing is hashed.
    /// Otherwise the fingerprint is looked up first and the resolver is
    /// only invoked on a miss; both `Some` and `None` answers are cached.
    pub fn resolve(
        &mut self,
        resolver: Option<&IdResolver<I>>,
        review: &ProductReview<I>,
    ) -> Option<I> {
        let resolver = resolver?;
        let key = fingerprint(review);
        if let Some(hit) = self.entries.get(&key) {
            return hit.clone();
        }
        let resolved = resolver(review);
        self.entries.insert(key, resolved.clone());
        resolved
    }
}

/// Stable hash of the product-descriptive fields. Two reviews of the same
/// product always collide here even when the resolver is nondeterministic.
fn fingerprint<I>(review: &ProductReview<I>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(review.product_name.as_bytes());
    hasher.update(b"|");
    hasher.update(review.product_number.as_bytes());
    hasher.update(b"|");
    hasher.update(review.product_price.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(review.product_url.as_bytes());
    hasher.finalize().into()
}
