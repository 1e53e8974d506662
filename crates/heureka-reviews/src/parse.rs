//! Strict parsing of one extracted feed fragment into an element tree.
//!
//! The scanner is deliberately lenient so that a malformed entry survives
//! extraction; this module is the strict counterpart. [`parse_fragment`]
//! returns `None` on any structural error and the caller drops the fragment
//! without producing a record or advancing the sequence index.

use chrono::{DateTime, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One parsed XML element: name, concatenated text content, and child
/// elements in document order.
#[derive(Debug, Default)]
pub(crate) struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// First child with the given element name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the named child; missing child reads as the empty string,
    /// matching the feed's "empty means not filled in" convention.
    pub fn text_of(&self, name: &str) -> String {
        self.child(name).map(|c| c.text.clone()).unwrap_or_default()
    }

    /// Integer value of the named child; missing or non-numeric reads as 0.
    pub fn i64_of(&self, name: &str) -> i64 {
        self.child(name).map_or(0, |c| leading_i64(&c.text))
    }

    /// Float value of the named child; missing or non-numeric reads as 0.0.
    pub fn f64_of(&self, name: &str) -> f64 {
        self.child(name).map_or(0.0, |c| leading_f64(&c.text))
    }

    /// Nullable star rating: `None` when the element is absent, otherwise
    /// the parsed value. Absence must never collapse to `0.0`: the rating
    /// scale floors at 0.5, so a zero would fabricate a rating the customer
    /// never gave.
    pub fn rating_of(&self, name: &str) -> Option<f64> {
        self.child(name).map(|c| leading_f64(&c.text))
    }
}

/// Parses one fragment into an [`Element`] tree.
///
/// Strict mode: mismatched or unterminated tags, invalid escapes, and any
/// other reader error yield `None`.
pub(crate) fn parse_fragment(xml: &str) -> Option<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = std::str::from_utf8(e.name().as_ref()).ok()?.to_owned();
                stack.push(Element {
                    name,
                    ..Element::default()
                });
            }
            Ok(Event::Empty(e)) => {
                let name = std::str::from_utf8(e.name().as_ref()).ok()?.to_owned();
                let element = Element {
                    name,
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => return None,
                }
            }
            Ok(Event::End(_)) => {
                let finished = stack.pop()?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(finished),
                    None if root.is_none() => root = Some(finished),
                    None => return None,
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().ok()?);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    // An unterminated element means the fragment was cut short.
    if !stack.is_empty() {
        return None;
    }
    root
}

/// Converts an epoch-seconds value to `DateTime<Utc>`, clamping anything
/// unrepresentable to the epoch itself.
pub(crate) fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parses the longest leading numeric prefix as `f64`, after trimming
/// whitespace. `"12.5 stars"` reads as 12.5; a non-numeric head reads as 0.0.
fn leading_f64(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0usize;
    let mut has_dot = false;

    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !has_dot => {
                has_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    trimmed[..end].parse().unwrap_or(0.0)
}

/// Integer counterpart of [`leading_f64`]: truncates at the decimal point.
fn leading_i64(s: &str) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let truncated = leading_f64(s).trunc() as i64;
    truncated
}
