//! Small helpers over lopdf's object model.

use lopdf::{Dictionary, Document, Object, Stream};

use crate::error::{Error, Result};
use crate::model::Rect;

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Follow references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            _ => return Some(current),
        }
    }
    None
}

/// Resolve an object that should be a dictionary.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Look up `key` in `dict` and resolve it.
pub(crate) fn get_resolved<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

/// Extract a number from an integer or real object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Extract a name as a string.
pub(crate) fn get_name(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
        _ => None,
    }
}

/// Read a rectangle array such as `/MediaBox [0 0 612 792]`.
pub(crate) fn get_rect(doc: &Document, obj: &Object) -> Option<Rect> {
    let array = match resolve(doc, obj)? {
        Object::Array(array) => array,
        _ => return None,
    };
    let values: Vec<f32> = array
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(get_number))
        .collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

/// Filter names of a stream, in the order they must be applied.
pub(crate) fn stream_filters(doc: &Document, stream: &Stream) -> Vec<String> {
    match get_resolved(doc, &stream.dict, b"Filter") {
        Some(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| resolve(doc, o).and_then(get_name))
            .collect(),
        _ => Vec::new(),
    }
}

/// Stream bytes with all filters undone.
///
/// Unfiltered streams are returned as-is; lopdf reports a missing
/// `/Filter` as an error.
pub(crate) fn stream_data(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| Error::PdfParse(e.to_string()))
}

/// Look up a page attribute, walking up the page tree for inheritable keys
/// (`Resources`, `MediaBox`, `CropBox`, `Rotate`).
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_REFERENCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node = node
            .get(b"Parent")
            .ok()
            .and_then(|parent| resolve_dict(doc, parent))?;
    }
    None
}
