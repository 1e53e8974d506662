//! Shared scan → parse → map → callback loop used by both clients.
//!
//! The two feed flavors plug in through [`FeedVariant`]: the target element
//! name and the per-fragment mapping. Everything else (tolerant skipping,
//! sequence indexing, callback dispatch, early termination) is identical
//! and lives here once.

use std::io::BufRead;
use std::ops::ControlFlow;

use crate::error::FeedError;
use crate::parse::parse_fragment;
use crate::scan::FragmentScanner;

/// One feed flavor: which element to extract and how to turn it into a
/// typed record.
pub(crate) trait FeedVariant {
    type Record;

    /// Name of the top-level feed element this variant consumes.
    fn node_name(&self) -> &'static str;

    /// Maps one successfully parsed fragment. `index` counts produced
    /// records from 0; skipped fragments never reach this method.
    fn map(&mut self, element: &crate::parse::Element, index: usize) -> Self::Record;
}

/// Per-record callback. Return [`ControlFlow::Break`] to stop the pass early.
pub type RecordCallback<T> = Box<dyn FnMut(&T) -> ControlFlow<()>>;

/// Drives one parse pass over `source` and returns the number of records
/// produced.
///
/// Fragments that fail the strict parse are skipped without advancing the
/// sequence index. The callback, when present, runs synchronously for each
/// record before the scanner advances.
///
/// # Errors
///
/// Returns [`FeedError::Stream`] when the underlying stream fails mid-scan.
pub(crate) fn run_feed<V: FeedVariant>(
    source: impl BufRead,
    variant: &mut V,
    mut callback: Option<&mut RecordCallback<V::Record>>,
) -> Result<usize, FeedError> {
    let mut scanner = FragmentScanner::new(source, variant.node_name());
    let mut index = 0usize;

    while let Some(fragment) = scanner.next_fragment()? {
        let Some(element) = parse_fragment(&fragment) else {
            tracing::debug!(
                target_node = variant.node_name(),
                "fragment failed to parse; skipped"
            );
            continue;
        };

        let record = variant.map(&element, index);
        index += 1;

        if let Some(cb) = callback.as_deref_mut() {
            if cb(&record).is_break() {
                tracing::debug!(records = index, "callback requested early stop");
                break;
            }
        }
    }

    Ok(index)
}
