mod capture;
#[cfg(windows)]
mod com;
#[cfg(feature = "hotkey")]
mod hotkey;
mod ocr;

use chartwatch_config::capture::{CaptureBackend, CaptureConfig};
use chartwatch_config::ocr::{OcrBackend, OcrConfig};
use chartwatch_core::{Error, Result};

#[cfg(feature = "screen")]
pub use capture::ScreenSurface;
pub use capture::{CaptureSurface, ImageFileSurface, Snapshot, crop, encode_png};
#[cfg(windows)]
pub use com::ComGuard;
#[cfg(feature = "hotkey")]
pub use hotkey::ToggleHotkey;
#[cfg(windows)]
pub use ocr::WindowsRecognizer;
pub use ocr::{TesseractRecognizer, TextRecognizer};

/// Build the configured capture backend. Nothing is acquired until
/// [`CaptureSurface::initialize`].
pub fn open_surface(config: &CaptureConfig) -> Result<Box<dyn CaptureSurface>> {
    match config.backend {
        CaptureBackend::File => Ok(Box::new(ImageFileSurface::new(
            &config.image_path,
            config.region,
        ))),
        #[cfg(feature = "screen")]
        CaptureBackend::Screen => Ok(Box::new(ScreenSurface::primary_monitor(config.region))),
        #[cfg(feature = "screen")]
        CaptureBackend::Window => {
            let title = config.target_window.clone().ok_or_else(|| {
                Error::Capture("window capture needs target_window".to_string())
            })?;
            Ok(Box::new(ScreenSurface::window(title, config.region)))
        }
        #[cfg(not(feature = "screen"))]
        CaptureBackend::Screen | CaptureBackend::Window => Err(Error::Capture(
            "live capture is not compiled in, rebuild with the `screen` feature".to_string(),
        )),
    }
}

pub fn open_recognizer(config: &OcrConfig) -> Result<Box<dyn TextRecognizer>> {
    match config.backend {
        OcrBackend::Tesseract => Ok(Box::new(TesseractRecognizer::new(
            &config.tesseract_path,
            &config.language,
        ))),
        #[cfg(windows)]
        OcrBackend::Windows => Ok(Box::new(WindowsRecognizer::new(&config.language))),
        #[cfg(not(windows))]
        OcrBackend::Windows => Err(Error::Recognition(
            "Windows OCR is only available on Windows".to_string(),
        )),
    }
}
