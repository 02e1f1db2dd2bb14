//! Downsampling options and configuration.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::imaging::ResampleFilter;

/// Sampling density images are sized for unless told otherwise.
pub const DEFAULT_TARGET_DPI: f32 = 300.0;

/// Flate level used for re-encoded images ("optimize").
pub const DEFAULT_COMPRESSION: u32 = 9;

/// Most pages a comma-separated selection may expand to.
pub const MAX_LISTED_PAGES: usize = 100_000;

/// Options for the image downsampler.
#[derive(Debug, Clone)]
pub struct DownsampleOptions {
    /// Density images are sized for, in dots per inch
    pub target_dpi: f32,

    /// Filter used when an image is shrunk
    pub filter: ResampleFilter,

    /// Flate level for re-encoded images (0-9)
    pub compression: u32,

    /// Which pages to visit
    pub pages: PageSelection,

    /// What to do when a single image cannot be processed
    pub error_mode: ErrorMode,
}

impl DownsampleOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target density.
    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.target_dpi = dpi;
        self
    }

    /// Set the resampling filter.
    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the flate level for re-encoded images.
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level;
        self
    }

    /// Set page selection.
    ///
    /// An image also drawn on a page outside the selection is left untouched.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Abort on the first image that cannot be processed.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.target_dpi.is_finite() || self.target_dpi <= 0.0 {
            return Err(Error::InvalidOption(format!(
                "target DPI must be a positive number, got {}",
                self.target_dpi
            )));
        }
        if self.compression > 9 {
            return Err(Error::InvalidOption(format!(
                "compression level must be 0-9, got {}",
                self.compression
            )));
        }
        Ok(())
    }
}

impl Default for DownsampleOptions {
    fn default() -> Self {
        Self {
            target_dpi: DEFAULT_TARGET_DPI,
            filter: ResampleFilter::default(),
            compression: DEFAULT_COMPRESSION,
            pages: PageSelection::All,
            error_mode: ErrorMode::Lenient,
        }
    }
}

/// Error handling mode for per-image failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Leave the image untouched and carry on
    #[default]
    Lenient,
    /// Fail the whole run
    Strict,
}

/// Page selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        // simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start = parse_page(start)?;
                let end = parse_page(end)?;
                if start > end {
                    return Err(Error::InvalidPageRange(s.to_string()));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        // comma-separated list with possible ranges
        let mut pages = BTreeSet::new();
        for part in s.split(',') {
            let part = part.trim();
            let (start, end) = match part.split_once('-') {
                Some((start, end)) => (parse_page(start)?, parse_page(end)?),
                None => {
                    let p = parse_page(part)?;
                    (p, p)
                }
            };
            if start > end {
                return Err(Error::InvalidPageRange(part.to_string()));
            }
            if u64::from(end - start) + 1 + pages.len() as u64 > MAX_LISTED_PAGES as u64 {
                return Err(Error::InvalidPageRange(format!(
                    "'{}' lists more than {} pages",
                    s, MAX_LISTED_PAGES
                )));
            }
            pages.extend(start..=end);
        }

        Ok(PageSelection::Pages(pages.into_iter().collect()))
    }

    /// Reject explicitly listed pages past the end of the document.
    ///
    /// Ranges are clipped silently; only a range starting past the last
    /// page is an error.
    pub fn check_against(&self, page_count: u32) -> Result<()> {
        match self {
            PageSelection::All => Ok(()),
            PageSelection::Range(range) if *range.start() > page_count => {
                Err(Error::PageOutOfRange(*range.start(), page_count))
            }
            PageSelection::Range(_) => Ok(()),
            PageSelection::Pages(pages) => match pages.iter().find(|p| **p > page_count) {
                Some(p) => Err(Error::PageOutOfRange(*p, page_count)),
                None => Ok(()),
            },
        }
    }
}

fn parse_page(s: &str) -> Result<u32> {
    match s.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::InvalidPageRange(format!(
            "'{}' is not a page number",
            s.trim()
        ))),
        Ok(p) => Ok(p),
    }
}
