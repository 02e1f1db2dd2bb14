//! Where images land on a page.
//!
//! Walks the page content with a graphics-state stack and records, for every
//! `Do` of an image XObject, the box covered by the unit square under the
//! current transformation matrix.

use std::collections::{HashMap, HashSet};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::objects::{get_number, get_resolved, resolve, stream_data};
use super::page::{page_resources, xobject_kind, XObjectKind};
use crate::error::{Error, Result};
use crate::model::{Matrix, Rect};

/// Placement rectangles per image object, in drawing order.
pub type Placements = HashMap<ObjectId, Vec<Rect>>;

const MAX_FORM_DEPTH: usize = 16;

/// Resolve image placements for one page.
///
/// A page without content has no placements. Content that cannot be
/// decoded is an [`Error::Placement`].
pub fn scan_page(doc: &Document, page_id: ObjectId) -> Result<Placements> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Placement(format!("page {:?}: {}", page_id, e)))?;

    let content = page_content(doc, page)?;
    let operations = decode(&content)?;

    let mut scanner = Scanner {
        doc,
        placements: HashMap::new(),
        active_forms: HashSet::new(),
    };
    scanner.run(&operations, page_resources(doc, page), Matrix::IDENTITY, 0)?;
    Ok(scanner.placements)
}

/// Concatenated content of a page; `/Contents` may be a stream or an array
/// of streams.
fn page_content(doc: &Document, page: &Dictionary) -> Result<Vec<u8>> {
    let Some(contents) = page.get(b"Contents").ok().and_then(|o| resolve(doc, o)) else {
        return Ok(Vec::new());
    };

    match contents {
        Object::Stream(stream) => stream_data(stream).map_err(placement_error),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                if let Some(Object::Stream(stream)) = resolve(doc, part) {
                    content.extend_from_slice(&stream_data(stream).map_err(placement_error)?);
                    content.push(b'\n');
                }
            }
            Ok(content)
        }
        _ => Err(Error::Placement("invalid /Contents".to_string())),
    }
}

fn decode(content: &[u8]) -> Result<Vec<Operation>> {
    Content::decode(content)
        .map(|c| c.operations)
        .map_err(|e| Error::Placement(e.to_string()))
}

fn placement_error(e: Error) -> Error {
    Error::Placement(e.to_string())
}

struct Scanner<'a> {
    doc: &'a Document,
    placements: Placements,
    // forms on the current recursion path
    active_forms: HashSet<ObjectId>,
}

impl<'a> Scanner<'a> {
    fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let mut ctm = ctm;
        let mut stack: Vec<Matrix> = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => {
                    // unbalanced Q is ignored
                    if let Some(saved) = stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(&op.operands) {
                        ctm = m.multiply(&ctm);
                    }
                }
                "Do" => {
                    let Some(Object::Name(name)) = op.operands.first() else {
                        continue;
                    };
                    let Some(id) = resources.and_then(|r| self.lookup_xobject(r, name)) else {
                        continue;
                    };
                    match xobject_kind(self.doc, id) {
                        XObjectKind::Image => {
                            self.placements
                                .entry(id)
                                .or_default()
                                .push(ctm.unit_square_bounds());
                        }
                        XObjectKind::Form => self.run_form(id, resources, ctm, depth)?,
                        XObjectKind::Other => {}
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn run_form(
        &mut self,
        form_id: ObjectId,
        parent_resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        if depth >= MAX_FORM_DEPTH || !self.active_forms.insert(form_id) {
            log::debug!("not descending into form {:?}", form_id);
            return Ok(());
        }

        let doc = self.doc;
        let result = match doc.get_object(form_id) {
            Ok(Object::Stream(form)) => {
                let matrix = get_resolved(doc, &form.dict, b"Matrix")
                    .and_then(|m| match m {
                        Object::Array(values) => matrix_operands(values),
                        _ => None,
                    })
                    .unwrap_or(Matrix::IDENTITY);
                let resources = get_resolved(doc, &form.dict, b"Resources")
                    .and_then(|o| match o {
                        Object::Dictionary(d) => Some(d),
                        _ => None,
                    })
                    .or(parent_resources);

                stream_data(form)
                    .map_err(placement_error)
                    .and_then(|content| decode(&content))
                    .and_then(|ops| self.run(&ops, resources, matrix.multiply(&ctm), depth + 1))
            }
            _ => Ok(()),
        };

        self.active_forms.remove(&form_id);
        result
    }

    fn lookup_xobject(&self, resources: &Dictionary, name: &[u8]) -> Option<ObjectId> {
        let xobjects = match get_resolved(self.doc, resources, b"XObject")? {
            Object::Dictionary(d) => d,
            _ => return None,
        };
        match xobjects.get(name).ok()? {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f32> = operands.iter().filter_map(get_number).collect();
    if values.len() != operands.len() {
        return None;
    }
    Matrix::from_slice(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn add_image(doc: &mut Document) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(2),
                "Height" => Object::Integer(2),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
            },
            vec![0, 64, 128, 255],
        ))
    }

    fn numbers(values: &[i64]) -> Object {
        Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
    }

    fn add_page(doc: &mut Document, xobjects: Dictionary, content: &[u8]) -> ObjectId {
        let contents = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        doc.add_object(dictionary! {
            "Type" => "Page",
            "Contents" => Object::Reference(contents),
            "Resources" => dictionary! { "XObject" => xobjects },
        })
    }

    #[test]
    fn test_simple_placement() {
        let mut doc = Document::with_version("1.5");
        let image = add_image(&mut doc);
        let page = add_page(
            &mut doc,
            dictionary! { "Im0" => Object::Reference(image) },
            b"q 144 0 0 72 100 200 cm /Im0 Do Q",
        );

        let placements = scan_page(&doc, page).unwrap();
        assert_eq!(placements[&image], vec![Rect::new(100.0, 200.0, 244.0, 272.0)]);
    }

    #[test]
    fn test_nested_cm_and_restore() {
        let mut doc = Document::with_version("1.5");
        let image = add_image(&mut doc);
        let page = add_page(
            &mut doc,
            dictionary! { "Im0" => Object::Reference(image) },
            b"1 0 0 1 10 10 cm q 2 0 0 2 0 0 cm 50 0 0 50 0 0 cm /Im0 Do Q 20 0 0 20 0 0 cm /Im0 Do",
        );

        let placements = scan_page(&doc, page).unwrap();
        assert_eq!(
            placements[&image],
            vec![
                Rect::new(10.0, 10.0, 110.0, 110.0),
                Rect::new(10.0, 10.0, 30.0, 30.0),
            ]
        );
    }

    #[test]
    fn test_placement_through_form() {
        let mut doc = Document::with_version("1.5");
        let image = add_image(&mut doc);
        let form = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => numbers(&[0, 0, 1, 1]),
                "Matrix" => numbers(&[1, 0, 0, 1, 5, 5]),
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Pic" => Object::Reference(image) },
                },
            },
            b"30 0 0 40 0 0 cm /Pic Do".to_vec(),
        ));
        let page = add_page(
            &mut doc,
            dictionary! { "Fm0" => Object::Reference(form) },
            b"1 0 0 1 100 100 cm /Fm0 Do",
        );

        let placements = scan_page(&doc, page).unwrap();
        assert_eq!(placements[&image], vec![Rect::new(105.0, 105.0, 135.0, 145.0)]);
    }

    #[test]
    fn test_self_referencing_form_terminates() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.new_object_id();
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Me" => Object::Reference(form_id) },
                },
            },
            b"/Me Do".to_vec(),
        );
        doc.objects.insert(form_id, Object::Stream(form));
        let page = add_page(
            &mut doc,
            dictionary! { "Fm0" => Object::Reference(form_id) },
            b"/Fm0 Do",
        );

        assert!(scan_page(&doc, page).unwrap().is_empty());
    }

    #[test]
    fn test_page_without_contents() {
        let mut doc = Document::with_version("1.5");
        let page = doc.add_object(dictionary! { "Type" => "Page" });
        assert!(scan_page(&doc, page).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_name_is_ignored() {
        let mut doc = Document::with_version("1.5");
        let image = add_image(&mut doc);
        let page = add_page(
            &mut doc,
            dictionary! { "Im0" => Object::Reference(image) },
            b"/Missing Do",
        );

        assert!(scan_page(&doc, page).unwrap().is_empty());
    }
}
