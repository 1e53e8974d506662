//! Forward-only scanner that isolates one feed entry at a time.
//!
//! The scanner walks the XML event stream and re-serializes the complete
//! subtree of every element whose name matches the target (`review` for the
//! shop feed, `product` for the product feed), at any nesting depth, in
//! document order. It never holds more than one fragment in memory, so a
//! file-backed feed is processed in O(one entry).
//!
//! Scanning runs in lenient mode: a structurally broken entry is abandoned
//! and scanning resumes at the next matching element, while entries that are
//! merely *textually* suspect (bad entities and the like) survive extraction
//! and are rejected later by the strict fragment parser in [`crate::parse`].

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::FeedError;

/// Lazy, non-restartable sequence of raw XML fragments.
pub(crate) struct FragmentScanner<R: BufRead> {
    reader: Reader<R>,
    target: &'static str,
    done: bool,
}

impl<R: BufRead> FragmentScanner<R> {
    pub fn new(source: R, target: &'static str) -> Self {
        let mut reader = Reader::from_reader(source);
        // Lenient: mismatched end tags are handled by the name stack in
        // collect_rest, not by the reader erroring out mid-document.
        reader.config_mut().check_end_names = false;
        Self {
            reader,
            target,
            done: false,
        }
    }

    /// Advances to the next matching element and returns its serialized
    /// subtree, or `None` when the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stream`] when the underlying reader fails with
    /// an I/O error. Any other reader error ends the scan without failing
    /// the run, the way the feed's original consumer stops when its cursor
    /// can no longer advance.
    pub fn next_fragment(&mut self) -> Result<Option<String>, FeedError> {
        if self.done {
            return Ok(None);
        }
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.name().as_ref() == self.target.as_bytes() => {
                    let mut writer = Writer::new(Vec::new());
                    if writer.write_event(Event::Start(e)).is_err() {
                        continue;
                    }
                    if let Some(fragment) = self.collect_rest(writer)? {
                        return Ok(Some(fragment));
                    }
                    if self.done {
                        return Ok(None);
                    }
                }
                Ok(Event::Empty(e)) if e.name().as_ref() == self.target.as_bytes() => {
                    let mut writer = Writer::new(Vec::new());
                    if writer.write_event(Event::Empty(e)).is_ok() {
                        if let Ok(fragment) = String::from_utf8(writer.into_inner()) {
                            if !fragment.is_empty() {
                                return Ok(Some(fragment));
                            }
                        }
                    }
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => {
                    self.end_scan(&e);
                    return self.stream_error(e);
                }
            }
        }
    }

    /// Consumes events up to the end tag matching the already-written start
    /// tag, re-serializing them into `writer`.
    ///
    /// Returns `Ok(None)` when the entry turns out to be malformed (end-tag
    /// mismatch, EOF before the subtree closes, or unwritable event); the
    /// occurrence is skipped and scanning continues.
    fn collect_rest(&mut self, mut writer: Writer<Vec<u8>>) -> Result<Option<String>, FeedError> {
        let mut open: Vec<Vec<u8>> = vec![self.target.as_bytes().to_vec()];
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => {
                    tracing::debug!(target_node = self.target, "feed ended inside an entry; entry skipped");
                    self.done = true;
                    return Ok(None);
                }
                Ok(event) => {
                    match &event {
                        Event::Start(e) => open.push(e.name().as_ref().to_vec()),
                        Event::End(e) => {
                            // A close tag that does not match the innermost
                            // open element marks the entry as malformed.
                            if open.last().map(Vec::as_slice) != Some(e.name().as_ref()) {
                                tracing::debug!(
                                    target_node = self.target,
                                    "mismatched end tag inside an entry; entry skipped"
                                );
                                return Ok(None);
                            }
                            open.pop();
                        }
                        _ => {}
                    }
                    if writer.write_event(event).is_err() {
                        return Ok(None);
                    }
                    if open.is_empty() {
                        let raw = writer.into_inner();
                        return Ok(String::from_utf8(raw).ok().filter(|s| !s.is_empty()));
                    }
                }
                Err(e) => {
                    self.end_scan(&e);
                    return self.stream_error(e).map(|_| None);
                }
            }
        }
    }

    fn end_scan(&mut self, error: &quick_xml::Error) {
        tracing::debug!(error = %error, "feed scan ended on reader error");
        self.done = true;
    }

    /// I/O failures are fatal; everything else ends the scan quietly.
    fn stream_error(&self, error: quick_xml::Error) -> Result<Option<String>, FeedError> {
        if matches!(error, quick_xml::Error::Io(_)) {
            Err(FeedError::Stream(error))
        } else {
            Ok(None)
        }
    }
}
