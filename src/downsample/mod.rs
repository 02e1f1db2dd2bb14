//! The image downsampler.
//!
//! Every image XObject on the selected pages is decoded, converted to
//! 8-bit gray, shrunk to fit the pixel size of its first placement at the
//! target DPI and written back under the same object id. Images that cannot
//! be processed are left as they are. When nothing was replaced the input
//! file is copied byte for byte instead of being re-serialized.

mod options;

pub use options::{
    DownsampleOptions, ErrorMode, PageSelection, DEFAULT_COMPRESSION, DEFAULT_TARGET_DPI,
    MAX_LISTED_PAGES,
};

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::detect::detect_format_from_bytes;
use crate::error::{Error, Result};
use crate::imaging::{
    decode_image, downsample, encode_gray_stream, replace_image, to_grayscale, DecodeError,
};
use crate::model::{
    DownsampleReport, ImageOutcome, ImageRef, ImageStatus, PageImages, SaveMode, SkipReason,
    TargetResolution,
};
use crate::parser::{page_images, PageScan};

/// Grayscales and downsamples the images of a document.
#[derive(Debug, Clone)]
pub struct Downsampler {
    options: DownsampleOptions,
}

impl Downsampler {
    /// Create a downsampler, rejecting unusable options.
    pub fn new(options: DownsampleOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &DownsampleOptions {
        &self.options
    }

    /// Process `input` and write the result to `output`.
    ///
    /// The output always exists after `Ok`: either the rewritten document or
    /// a verbatim copy of the input. Nothing is written when an error is
    /// returned.
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<DownsampleReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        let original = fs::read(input)?;
        let mut doc = load_document(&original)?;

        let mut report = self.process_document(&mut doc)?;
        report.input_bytes = original.len() as u64;

        if report.modified() {
            let bytes = save_document(&mut doc)?;
            fs::write(output, &bytes)?;
            report.save_mode = SaveMode::Rewritten;
            report.output_bytes = bytes.len() as u64;
        } else {
            if !same_file(input, output) {
                fs::write(output, &original)?;
            }
            report.save_mode = SaveMode::CopiedVerbatim;
            report.output_bytes = original.len() as u64;
        }

        log::info!(
            "{}: {} image(s) seen, {} replaced ({} downsampled), {} skipped; {}",
            input.display(),
            report.images_seen(),
            report.images_replaced(),
            report.images_downsampled(),
            report.images_skipped(),
            match report.save_mode {
                SaveMode::Rewritten => "rewritten",
                SaveMode::CopiedVerbatim => "copied verbatim",
            }
        );

        Ok(report)
    }

    /// Process a document in memory.
    ///
    /// The returned report's `modified()` tells whether the document was
    /// changed; saving it is up to the caller.
    pub fn process_document(&self, doc: &mut Document) -> Result<DownsampleReport> {
        let pages = doc.get_pages();
        self.options.pages.check_against(pages.len() as u32)?;

        let dpi = self.options.target_dpi;
        let mut report = DownsampleReport::default();
        let mut processed: HashSet<ObjectId> = HashSet::new();
        let outside = self.images_outside_selection(doc, &pages);

        for (&number, &page_id) in &pages {
            if !self.options.pages.includes(number) {
                continue;
            }
            report.pages_visited += 1;

            let scan = match PageScan::new(doc, number, page_id) {
                Ok(scan) => scan,
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("page {}: skipped: {}", number, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            for image in &scan.images {
                let (rect, sizing, target) = scan.sizing_for(image.object_id, dpi);
                log::debug!(
                    "page {} {} {:?}: {}x{} px, sized by {:?} {} -> target {}",
                    number,
                    image.name,
                    image.object_id,
                    image.width,
                    image.height,
                    sizing,
                    rect,
                    target
                );

                let status = if processed.contains(&image.object_id) {
                    ImageStatus::Skipped {
                        reason: SkipReason::AlreadyProcessed,
                    }
                } else if outside.contains(&image.object_id) {
                    ImageStatus::Skipped {
                        reason: SkipReason::SharedWithUnselectedPage,
                    }
                } else if image.is_stencil_mask {
                    ImageStatus::Skipped {
                        reason: SkipReason::StencilMask,
                    }
                } else {
                    match self.process_image(doc, image, target) {
                        Ok((original, output)) => {
                            processed.insert(image.object_id);
                            ImageStatus::Replaced { original, output }
                        }
                        Err(reason) => {
                            if self.options.error_mode == ErrorMode::Strict {
                                return Err(strict_error(number, image, &reason));
                            }
                            log::warn!(
                                "page {}: leaving image {} {:?} unchanged: {}",
                                number,
                                image.name,
                                image.object_id,
                                reason
                            );
                            ImageStatus::Skipped { reason }
                        }
                    }
                };

                if let ImageStatus::Replaced { original, output } = &status {
                    log::debug!(
                        "page {} {}: {}x{} -> {}x{} gray",
                        number,
                        image.name,
                        original.0,
                        original.1,
                        output.0,
                        output.1
                    );
                }

                report.images.push(ImageOutcome {
                    page: number,
                    object_id: image.object_id,
                    name: image.name.clone(),
                    sizing,
                    target,
                    status,
                });
            }
        }

        Ok(report)
    }

    /// Images referenced by pages the selection leaves out.
    ///
    /// Replacement keeps the object id, so touching one of these would
    /// change an unselected page too.
    fn images_outside_selection(
        &self,
        doc: &Document,
        pages: &BTreeMap<u32, ObjectId>,
    ) -> HashSet<ObjectId> {
        if self.options.pages == PageSelection::All {
            return HashSet::new();
        }
        pages
            .iter()
            .filter(|(number, _)| !self.options.pages.includes(**number))
            .filter_map(|(_, &page_id)| page_images(doc, page_id).ok())
            .flatten()
            .map(|image| image.object_id)
            .collect()
    }

    /// Decode, gray, shrink, encode and re-insert one image.
    ///
    /// Returns the pixel size before and after.
    fn process_image(
        &self,
        doc: &mut Document,
        image: &ImageRef,
        target: TargetResolution,
    ) -> std::result::Result<((u32, u32), (u32, u32)), SkipReason> {
        let replacement = {
            let stream = match doc.get_object(image.object_id) {
                Ok(Object::Stream(stream)) => stream,
                _ => {
                    return Err(SkipReason::DecodeFailed(
                        "image object is not a stream".to_string(),
                    ))
                }
            };

            let decoded = decode_image(doc, stream).map_err(|e| match e {
                DecodeError::Unsupported(what) => SkipReason::Unsupported(what),
                DecodeError::Invalid(msg) => SkipReason::DecodeFailed(msg),
            })?;
            let original = (decoded.width(), decoded.height());

            let gray = downsample(to_grayscale(&decoded), target, self.options.filter);
            let output = gray.dimensions();

            let new_stream = encode_gray_stream(&gray, self.options.compression, &stream.dict)
                .map_err(|e| SkipReason::EncodeFailed(e.to_string()))?;
            (new_stream, original, output)
        };

        let (new_stream, original, output) = replacement;
        replace_image(doc, image.object_id, new_stream)
            .map_err(|e| SkipReason::ReinsertFailed(e.to_string()))?;
        Ok((original, output))
    }

    /// List the images of the selected pages without changing anything.
    pub fn inspect_document(&self, doc: &Document) -> Result<Vec<PageImages>> {
        let pages = doc.get_pages();
        self.options.pages.check_against(pages.len() as u32)?;

        let mut listing = Vec::new();
        for (&number, &page_id) in &pages {
            if !self.options.pages.includes(number) {
                continue;
            }
            let scan = PageScan::new(doc, number, page_id)?;
            listing.push(scan.to_page_images(self.options.target_dpi));
        }
        Ok(listing)
    }

    /// Read `input` and list its images.
    pub fn inspect_file<P: AsRef<Path>>(&self, input: P) -> Result<Vec<PageImages>> {
        let data = fs::read(input)?;
        let doc = load_document(&data)?;
        self.inspect_document(&doc)
    }
}

/// Check the header and parse a document from memory.
pub(crate) fn load_document(data: &[u8]) -> Result<Document> {
    let format = detect_format_from_bytes(data)?;
    log::debug!("detected {}", format);

    let doc = Document::load_mem(data).map_err(|e| match e {
        lopdf::Error::Decryption(_) => Error::Encrypted,
        _ => Error::from(e),
    })?;
    if doc.is_encrypted() {
        return Err(Error::Encrypted);
    }
    Ok(doc)
}

/// Garbage-collect, compress and serialize.
fn save_document(doc: &mut Document) -> Result<Vec<u8>> {
    // empty streams stay: an image that failed to decode may be one
    let pruned = doc.prune_objects();
    if !pruned.is_empty() {
        log::debug!("removed {} unreachable object(s)", pruned.len());
    }
    doc.renumber_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn strict_error(page: u32, image: &ImageRef, reason: &SkipReason) -> Error {
    let context = format!("page {} image {} {:?}: {}", page, image.name, image.object_id, reason);
    match reason {
        SkipReason::EncodeFailed(_) => Error::ImageEncode(context),
        SkipReason::ReinsertFailed(_) => Error::Other(context),
        _ => Error::ImageDecode(context),
    }
}
