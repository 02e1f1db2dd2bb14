//! Ghostscript `pdfwrite` as the external compressor.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{PdfCompressor, QualityPreset};
use crate::error::{Error, Result};

/// Flags passed on every run: batch mode, pdfwrite, gray output and
/// embedded subset fonts.
const BASE_ARGS: &[&str] = &[
    "-q",
    "-dNOPAUSE",
    "-dBATCH",
    "-dSAFER",
    "-sDEVICE=pdfwrite",
    "-dCompatibilityLevel=1.4",
    "-sColorConversionStrategy=Gray",
    "-dProcessColorModel=/DeviceGray",
    "-dEmbedAllFonts=true",
    "-dSubsetFonts=true",
    "-dCompressFonts=true",
];

/// Name of the Ghostscript executable on this platform.
pub fn default_binary() -> &'static str {
    if cfg!(windows) {
        "gswin64c"
    } else {
        "gs"
    }
}

/// Runs Ghostscript as a child process.
#[derive(Debug, Clone)]
pub struct GhostscriptCompressor {
    binary: PathBuf,
}

impl GhostscriptCompressor {
    /// Use the Ghostscript found on `PATH`.
    pub fn new() -> Self {
        Self::with_binary(default_binary())
    }

    /// Use a specific executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Full argument list for one run.
    ///
    /// Preset flags precede the file names; Ghostscript reads settings in
    /// order and applies them to the files that follow.
    pub fn build_args(&self, input: &Path, output: &Path, preset: QualityPreset) -> Vec<OsString> {
        let mut args: Vec<OsString> = BASE_ARGS.iter().map(OsString::from).collect();

        let dpi = preset.image_dpi();
        args.push(format!("-dPDFSETTINGS={}", preset.pdf_settings()).into());
        args.push(format!("-dColorImageResolution={}", dpi).into());
        args.push(format!("-dGrayImageResolution={}", dpi).into());

        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output.as_os_str());
        args.push(output_arg);
        args.push(input.as_os_str().to_owned());
        args
    }

    /// Whether the executable can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

impl Default for GhostscriptCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfCompressor for GhostscriptCompressor {
    fn name(&self) -> &str {
        "ghostscript"
    }

    fn compress(&self, input: &Path, output: &Path, preset: QualityPreset) -> Result<()> {
        let args = self.build_args(input, output, preset);
        log::debug!("running {} {:?}", self.binary.display(), args);

        let result = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::CompressorNotFound(self.binary.clone()),
                _ => Error::Io(e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            log::warn!("ghostscript failed on {}: {}", input.display(), stderr);
            return Err(Error::CompressorFailed {
                // killed by a signal when there is no code
                status: result.status.code().unwrap_or(-1),
                stderr,
            });
        }

        if !output.exists() {
            return Err(Error::CompressorFailed {
                status: 0,
                stderr: format!("no output written to {}", output.display()),
            });
        }
        Ok(())
    }
}
