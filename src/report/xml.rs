//! Streaming XML helpers shared by the report parsers.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{RatchetError, Result};

/// Visits every element start tag in a report together with its depth
/// (the root element has depth 0).
///
/// The document must be well formed: mismatched or unclosed tags and a
/// missing root element are reported as errors.
pub(crate) fn visit_elements<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&BytesStart<'_>, usize) -> Result<()>,
{
    let bytes = fs::read(path).map_err(|e| RatchetError::report(path, e.to_string()))?;

    let mut reader = Reader::from_reader(bytes.as_slice());
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(tag)) => {
                visit(&tag, depth)?;
                depth += 1;
                saw_root = true;
            }
            Ok(Event::Empty(tag)) => {
                visit(&tag, depth)?;
                saw_root = true;
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(RatchetError::report(
                    path,
                    format!(
                        "malformed XML at position {}: {}",
                        reader.buffer_position(),
                        err
                    ),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(RatchetError::report(path, "document has no root element"));
    }
    if depth != 0 {
        return Err(RatchetError::report(
            path,
            format!("document ended with {} unclosed element(s)", depth),
        ));
    }

    Ok(())
}

/// Counts elements named `name` anywhere in the document.
pub(crate) fn count_elements(path: &Path, name: &str) -> Result<u64> {
    let mut count = 0u64;
    visit_elements(path, |tag, _| {
        if tag.name().as_ref() == name.as_bytes() {
            count += 1;
        }
        Ok(())
    })?;
    Ok(count)
}

/// Reads an attribute as a string, unescaping entities.
pub(crate) fn attribute_value(tag: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    tag.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
