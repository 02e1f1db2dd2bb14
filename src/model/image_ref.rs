//! Pages and the image XObjects drawn on them.

use lopdf::ObjectId;
use serde::{Deserialize, Serialize};

use super::geometry::{effective_dpi, Rect, TargetResolution};

/// A page of the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub number: u32,
    /// Object id of the page dictionary
    pub object_id: ObjectId,
    /// Visible page rectangle, rotation applied
    pub rect: Rect,
}

/// An image XObject reachable from a page's resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Object id of the image stream
    pub object_id: ObjectId,
    /// Resource name the image was found under (e.g. "Im1")
    pub name: String,
    /// Width in pixels as declared by the stream dictionary
    pub width: u32,
    /// Height in pixels as declared by the stream dictionary
    pub height: u32,
    /// Color space family (e.g., "DeviceRGB", "Indexed")
    pub color_space: Option<String>,
    /// Bits per component
    pub bits_per_component: Option<u8>,
    /// Last filter in the chain, the one that yields pixels (e.g., "DCTDecode")
    pub filter: Option<String>,
    /// `/ImageMask true` stencil masks carry no color of their own
    pub is_stencil_mask: bool,
}

impl ImageRef {
    /// Pixel dimensions declared by the dictionary.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Which rectangle a target resolution was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingBasis {
    /// The first rectangle the image is painted into
    Placement,
    /// The whole page, used when no placement could be resolved
    Page,
}

/// Read-only view of one image on one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image: ImageRef,
    /// Every rectangle the image is painted into on this page, in drawing order
    pub placements: Vec<Rect>,
    /// Rectangle used for sizing
    pub sizing_rect: Rect,
    pub sizing: SizingBasis,
    /// Pixel size at the configured DPI
    pub target: TargetResolution,
}

impl ImageInfo {
    /// Current horizontal density of the image over its sizing rectangle.
    pub fn effective_dpi(&self) -> Option<f32> {
        effective_dpi(self.image.width, self.sizing_rect.width())
    }

    /// Whether downsampling would shrink this image.
    pub fn needs_downsampling(&self) -> bool {
        self.target
            .is_exceeded_by(self.image.width, self.image.height)
    }
}

/// Images of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImages {
    pub page: PageInfo,
    pub images: Vec<ImageInfo>,
}

impl PageImages {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
