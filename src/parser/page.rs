//! Page geometry and image enumeration.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::objects::{get_name, get_number, get_rect, get_resolved, inherited, resolve, resolve_dict};
use crate::error::{Error, Result};
use crate::model::{ImageRef, PageInfo, Rect, LETTER};

/// Forms nested deeper than this are not searched for images.
const MAX_FORM_DEPTH: usize = 16;

/// Read the visible rectangle of a page.
///
/// CropBox (clipped to the MediaBox) when present, otherwise MediaBox,
/// otherwise US Letter. A `/Rotate` of 90 or 270 swaps the sides.
pub fn page_info(doc: &Document, number: u32, page_id: ObjectId) -> Result<PageInfo> {
    let dict = doc
        .get_dictionary(page_id)
        .map_err(|_| Error::MissingObject(format!("page {} ({:?})", number, page_id)))?;

    let media_box = inherited(doc, dict, b"MediaBox")
        .and_then(|obj| get_rect(doc, obj))
        .filter(|rect| !rect.is_empty())
        .unwrap_or(LETTER);

    let visible = inherited(doc, dict, b"CropBox")
        .and_then(|obj| get_rect(doc, obj))
        .and_then(|crop| crop.intersect(&media_box))
        .unwrap_or(media_box);

    let rotate = inherited(doc, dict, b"Rotate")
        .and_then(|obj| resolve(doc, obj))
        .and_then(get_number)
        .map(|r| (r as i64).rem_euclid(360))
        .unwrap_or(0);

    let rect = if rotate == 90 || rotate == 270 {
        visible.transposed()
    } else {
        visible
    };

    Ok(PageInfo {
        number,
        object_id: page_id,
        rect,
    })
}

/// The resource dictionary in effect for a page.
pub(crate) fn page_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    inherited(doc, page, b"Resources").and_then(|obj| resolve_dict(doc, obj))
}

/// `/XObject` entries of a resource dictionary as (name, object id) pairs,
/// in dictionary order. Inline (direct) XObjects are not addressable and
/// are left out.
pub(crate) fn xobject_entries(doc: &Document, resources: &Dictionary) -> Vec<(String, ObjectId)> {
    let Some(xobjects) = get_resolved(doc, resources, b"XObject").and_then(|o| match o {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, value)| match value {
            Object::Reference(id) => Some((String::from_utf8_lossy(name).to_string(), *id)),
            _ => None,
        })
        .collect()
}

/// Kind of an XObject stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XObjectKind {
    Image,
    Form,
    Other,
}

pub(crate) fn xobject_kind(doc: &Document, id: ObjectId) -> XObjectKind {
    let Ok(Object::Stream(stream)) = doc.get_object(id) else {
        return XObjectKind::Other;
    };
    match get_resolved(doc, &stream.dict, b"Subtype").and_then(get_name).as_deref() {
        Some("Image") => XObjectKind::Image,
        Some("Form") => XObjectKind::Form,
        _ => XObjectKind::Other,
    }
}

/// List the image XObjects a page can draw.
///
/// Images named directly in the page resources come first, in dictionary
/// order, followed by images reachable through form XObjects (depth first).
/// Each image object appears once.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Result<Vec<ImageRef>> {
    let dict = doc
        .get_dictionary(page_id)
        .map_err(|_| Error::MissingObject(format!("page {:?}", page_id)))?;

    let mut images = Vec::new();
    if let Some(resources) = page_resources(doc, dict) {
        let mut seen = HashSet::new();
        let mut visited_forms = HashSet::new();
        collect_images(doc, resources, &mut images, &mut seen, &mut visited_forms, 0);
    }
    Ok(images)
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    images: &mut Vec<ImageRef>,
    seen: &mut HashSet<ObjectId>,
    visited_forms: &mut HashSet<ObjectId>,
    depth: usize,
) {
    let entries = xobject_entries(doc, resources);
    let mut forms = Vec::new();

    for (name, id) in entries {
        match xobject_kind(doc, id) {
            XObjectKind::Image => {
                if seen.insert(id) {
                    if let Some(image) = image_ref(doc, id, name) {
                        images.push(image);
                    }
                }
            }
            XObjectKind::Form => forms.push(id),
            XObjectKind::Other => {}
        }
    }

    if depth >= MAX_FORM_DEPTH {
        return;
    }

    for form_id in forms {
        if !visited_forms.insert(form_id) {
            continue;
        }
        let Ok(Object::Stream(form)) = doc.get_object(form_id) else {
            continue;
        };
        // A form without its own resources draws from the page's, which
        // have already been listed.
        if let Some(form_resources) = get_resolved(doc, &form.dict, b"Resources").and_then(|o| match o {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }) {
            collect_images(doc, form_resources, images, seen, visited_forms, depth + 1);
        }
    }
}

/// Describe an image XObject from its stream dictionary.
pub fn image_ref(doc: &Document, id: ObjectId, name: String) -> Option<ImageRef> {
    let Ok(Object::Stream(stream)) = doc.get_object(id) else {
        return None;
    };
    let dict = &stream.dict;

    let dimension = |key: &[u8]| {
        get_resolved(doc, dict, key)
            .and_then(get_number)
            .filter(|v| *v > 0.0)
            .map(|v| v as u32)
            .unwrap_or(0)
    };

    let color_space = get_resolved(doc, dict, b"ColorSpace").and_then(|cs| match cs {
        Object::Name(_) => get_name(cs),
        Object::Array(arr) => arr.first().and_then(|o| resolve(doc, o)).and_then(get_name),
        _ => None,
    });

    let bits_per_component = get_resolved(doc, dict, b"BitsPerComponent")
        .and_then(get_number)
        .map(|b| b as u8);

    let filter = super::objects::stream_filters(doc, stream).pop();

    let is_stencil_mask = matches!(
        get_resolved(doc, dict, b"ImageMask"),
        Some(Object::Boolean(true))
    );

    Some(ImageRef {
        object_id: id,
        name,
        width: dimension(b"Width"),
        height: dimension(b"Height"),
        color_space,
        bits_per_component,
        filter,
        is_stencil_mask,
    })
}

/// Convenience for callers that only need the page rectangle.
pub fn page_rect(doc: &Document, page_id: ObjectId) -> Rect {
    page_info(doc, 0, page_id)
        .map(|info| info.rect)
        .unwrap_or(LETTER)
}
