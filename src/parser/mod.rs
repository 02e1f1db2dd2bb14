//! Reading pages: geometry, the images they reference, and where those
//! images are drawn.

pub(crate) mod objects;
mod page;
mod placement;

pub use page::{image_ref, page_images, page_info, page_rect};
pub use placement::{scan_page, Placements};

use lopdf::{Document, ObjectId};

use crate::error::Result;
use crate::model::{
    target_pixels, ImageInfo, ImageRef, PageImages, PageInfo, Rect, SizingBasis, TargetResolution,
};

/// Everything the downsampler needs to know about one page.
#[derive(Debug, Clone)]
pub struct PageScan {
    pub page: PageInfo,
    /// Images in enumeration order
    pub images: Vec<ImageRef>,
    /// `None` when the page content could not be interpreted
    pub placements: Option<Placements>,
}

impl PageScan {
    /// Scan a page. Only a missing page dictionary is an error; content
    /// that cannot be interpreted leaves `placements` unset.
    pub fn new(doc: &Document, number: u32, page_id: ObjectId) -> Result<Self> {
        let page = page_info(doc, number, page_id)?;
        let images = page_images(doc, page_id)?;

        let placements = if images.is_empty() {
            Some(Placements::new())
        } else {
            match scan_page(doc, page_id) {
                Ok(placements) => Some(placements),
                Err(e) => {
                    log::warn!("page {}: cannot resolve image placements: {}", number, e);
                    None
                }
            }
        };

        Ok(Self {
            page,
            images,
            placements,
        })
    }

    /// First rectangle `id` is painted into on this page.
    pub fn first_placement(&self, id: ObjectId) -> Option<Rect> {
        self.placements
            .as_ref()?
            .get(&id)?
            .first()
            .copied()
    }

    /// Rectangle, basis and pixel target used to size `id`.
    ///
    /// Falls back to the page rectangle when no placement is known.
    pub fn sizing_for(&self, id: ObjectId, dpi: f32) -> (Rect, SizingBasis, TargetResolution) {
        let (rect, basis) = match self.first_placement(id) {
            Some(rect) => (rect, SizingBasis::Placement),
            None => (self.page.rect, SizingBasis::Page),
        };
        (rect, basis, target_pixels(&rect, dpi))
    }

    /// Read-only summary of this page's images at `dpi`.
    pub fn to_page_images(&self, dpi: f32) -> PageImages {
        let images = self
            .images
            .iter()
            .map(|image| {
                let (sizing_rect, sizing, target) = self.sizing_for(image.object_id, dpi);
                let placements = self
                    .placements
                    .as_ref()
                    .and_then(|p| p.get(&image.object_id))
                    .cloned()
                    .unwrap_or_default();
                ImageInfo {
                    image: image.clone(),
                    placements,
                    sizing_rect,
                    sizing,
                    target,
                }
            })
            .collect();

        PageImages {
            page: self.page.clone(),
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};

    fn build(content: &[u8]) -> (Document, ObjectId, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let image = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(1200),
                "Height" => Object::Integer(600),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
            },
            Vec::new(),
        ));
        let contents = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
            "Contents" => Object::Reference(contents),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image) },
            },
        });
        (doc, page, image)
    }

    #[test]
    fn test_sizing_from_placement() {
        let (doc, page, image) = build(b"q 144 0 0 72 0 0 cm /Im0 Do Q");
        let scan = PageScan::new(&doc, 1, page).unwrap();

        let (_, basis, target) = scan.sizing_for(image, 300.0);
        assert_eq!(basis, SizingBasis::Placement);
        assert_eq!(target, TargetResolution::new(600, 300));
    }

    #[test]
    fn test_sizing_falls_back_to_page() {
        // referenced but never drawn
        let (doc, page, image) = build(b"");
        let scan = PageScan::new(&doc, 1, page).unwrap();

        let (rect, basis, target) = scan.sizing_for(image, 300.0);
        assert_eq!(basis, SizingBasis::Page);
        assert_eq!(rect, Rect::from_size(612.0, 792.0));
        assert_eq!(target, TargetResolution::new(2550, 3300));
    }

    #[test]
    fn test_to_page_images() {
        let (doc, page, _) =
            build(b"q 144 0 0 72 0 0 cm /Im0 Do Q q 72 0 0 72 300 300 cm /Im0 Do Q");
        let scan = PageScan::new(&doc, 1, page).unwrap();
        let listing = scan.to_page_images(300.0);

        assert_eq!(listing.images.len(), 1);
        assert_eq!(listing.images[0].placements.len(), 2);
        assert_eq!(listing.images[0].sizing_rect, Rect::from_size(144.0, 72.0));
        assert!(listing.images[0].needs_downsampling());
    }
}
