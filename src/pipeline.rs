//! Downsample, then compress: the full shrink pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compress::{CompressOptions, PdfCompressor, QualityPreset};
use crate::downsample::{DownsampleOptions, Downsampler};
use crate::error::Result;
use crate::model::DownsampleReport;

/// Options for [`Shrinker`].
#[derive(Debug, Clone, Default)]
pub struct ShrinkOptions {
    /// Image downsampling pass
    pub downsample: DownsampleOptions,

    /// External compression pass
    pub compress: CompressOptions,

    /// Skip the external compressor; the downsampled file is the result
    pub skip_external: bool,
}

impl ShrinkOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set downsampling options.
    pub fn with_downsample(mut self, options: DownsampleOptions) -> Self {
        self.downsample = options;
        self
    }

    /// Set compression options.
    pub fn with_compress(mut self, options: CompressOptions) -> Self {
        self.compress = options;
        self
    }

    /// Set the quality preset of the compression pass.
    pub fn with_preset(mut self, preset: QualityPreset) -> Self {
        self.compress.preset = preset;
        self
    }

    /// Run the downsampler only.
    pub fn without_external(mut self) -> Self {
        self.skip_external = true;
        self
    }
}

/// Outcome of a full shrink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkReport {
    /// What the downsampling pass did
    pub downsample: DownsampleReport,
    /// Compressor that ran, if any
    pub compressor: Option<String>,
    /// Preset given to the compressor
    pub preset: Option<QualityPreset>,
    /// Size of the input file in bytes
    pub input_bytes: u64,
    /// Size of the final output in bytes
    pub output_bytes: u64,
}

impl ShrinkReport {
    /// Final size relative to the input.
    pub fn ratio(&self) -> Option<f64> {
        if self.input_bytes == 0 {
            return None;
        }
        Some(self.output_bytes as f64 / self.input_bytes as f64)
    }

    /// Render as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Runs the downsampler into a scratch directory and the external
/// compressor from there to the destination.
pub struct Shrinker {
    downsampler: Downsampler,
    compressor: Box<dyn PdfCompressor>,
    preset: QualityPreset,
    skip_external: bool,
}

impl Shrinker {
    /// Build a shrinker using Ghostscript as described by `options`.
    pub fn new(options: ShrinkOptions) -> Result<Self> {
        let compressor = Box::new(options.compress.compressor());
        Self::with_compressor(options, compressor)
    }

    /// Build a shrinker around any compressor.
    pub fn with_compressor(
        options: ShrinkOptions,
        compressor: Box<dyn PdfCompressor>,
    ) -> Result<Self> {
        Ok(Self {
            downsampler: Downsampler::new(options.downsample)?,
            compressor,
            preset: options.compress.preset,
            skip_external: options.skip_external,
        })
    }

    /// Shrink `input` into `output`.
    ///
    /// `output` is only written once every stage has succeeded.
    pub fn shrink_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<ShrinkReport> {
        let input = input.as_ref();
        let output = output.as_ref();

        let scratch = tempfile::Builder::new().prefix("pdfshrink").tempdir()?;
        let mid = scratch.path().join("mid.pdf");
        let downsample = self.downsampler.process_file(input, &mid)?;

        let (compressor, preset) = if self.skip_external {
            fs::copy(&mid, output)?;
            (None, None)
        } else {
            let compressed = scratch.path().join("out.pdf");
            log::info!(
                "compressing with {} ({})",
                self.compressor.name(),
                self.preset
            );
            self.compressor.compress(&mid, &compressed, self.preset)?;
            fs::copy(&compressed, output)?;
            (Some(self.compressor.name().to_string()), Some(self.preset))
        };

        let output_bytes = fs::metadata(output)?.len();
        Ok(ShrinkReport {
            input_bytes: downsample.input_bytes,
            downsample,
            compressor,
            preset,
            output_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use lopdf::dictionary;

    /// Copies its input and counts calls.
    struct CopyCompressor {
        calls: Arc<AtomicUsize>,
    }

    impl PdfCompressor for CopyCompressor {
        fn name(&self) -> &str {
            "copy"
        }

        fn compress(&self, input: &Path, output: &Path, _preset: QualityPreset) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::copy(input, output)?;
            Ok(())
        }
    }

    struct FailingCompressor;

    impl PdfCompressor for FailingCompressor {
        fn name(&self) -> &str {
            "failing"
        }

        fn compress(&self, _input: &Path, _output: &Path, _preset: QualityPreset) -> Result<()> {
            Err(Error::CompressorFailed {
                status: 1,
                stderr: "boom".to_string(),
            })
        }
    }

    fn minimal_pdf() -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages = doc.new_object_id();
        let page = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => lopdf::Object::Reference(pages),
        });
        doc.objects.insert(
            pages,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![lopdf::Object::Reference(page)],
                "Count" => lopdf::Object::Integer(1),
            }),
        );
        let catalog = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => lopdf::Object::Reference(pages),
        });
        doc.trailer.set("Root", lopdf::Object::Reference(catalog));
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_shrink_with_custom_compressor() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        let bytes = minimal_pdf();
        fs::write(&input, &bytes).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let shrinker = Shrinker::with_compressor(
            ShrinkOptions::new().with_preset(QualityPreset::MaxCompression),
            Box::new(CopyCompressor {
                calls: calls.clone(),
            }),
        )
        .unwrap();

        let report = shrinker.shrink_file(&input, &output).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.compressor.as_deref(), Some("copy"));
        assert_eq!(report.preset, Some(QualityPreset::MaxCompression));
        assert_eq!(fs::read(&output).unwrap(), bytes);
        assert_eq!(report.ratio(), Some(1.0));
    }

    #[test]
    fn test_skip_external() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        fs::write(&input, minimal_pdf()).unwrap();

        let shrinker = Shrinker::with_compressor(
            ShrinkOptions::new().without_external(),
            Box::new(FailingCompressor),
        )
        .unwrap();

        let report = shrinker.shrink_file(&input, &output).unwrap();
        assert!(report.compressor.is_none());
        assert!(output.exists());
    }

    #[test]
    fn test_compressor_failure_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        fs::write(&input, minimal_pdf()).unwrap();

        let shrinker =
            Shrinker::with_compressor(ShrinkOptions::new(), Box::new(FailingCompressor)).unwrap();

        assert!(matches!(
            shrinker.shrink_file(&input, &output),
            Err(Error::CompressorFailed { status: 1, .. })
        ));
        assert!(!output.exists());
    }
}
