use std::io::Cursor;
use std::path::PathBuf;

use chartwatch_core::{Error, Result};
use chartwatch_types::CaptureRegion;
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};

/// One still frame, PNG encoded
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_image(image: &RgbaImage) -> Result<Self> {
        Ok(Self {
            png: encode_png(image)?,
            width: image.width(),
            height: image.height(),
            captured_at: Utc::now(),
        })
    }
}

/// Source of screen frames.
///
/// `initialize` must succeed before `snapshot` is used; `stop` releases the
/// source and may be called any number of times.
#[async_trait::async_trait]
pub trait CaptureSurface: Send + Sync {
    /// Name recorded as the notification source
    fn label(&self) -> &str;

    /// Application the frames come from, when known
    fn app_name(&self) -> Option<String> {
        None
    }

    fn region(&self) -> Option<CaptureRegion> {
        None
    }

    fn is_active(&self) -> bool;

    async fn initialize(&mut self) -> Result<()>;

    async fn snapshot(&self) -> Result<Snapshot>;

    async fn stop(&mut self);
}

/// Reads a still image that an external screenshot tool keeps refreshing
pub struct ImageFileSurface {
    path: PathBuf,
    region: Option<CaptureRegion>,
    active: bool,
}

impl ImageFileSurface {
    pub fn new(path: impl Into<PathBuf>, region: Option<CaptureRegion>) -> Self {
        Self {
            path: path.into(),
            region,
            active: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSurface for ImageFileSurface {
    fn label(&self) -> &str {
        "file"
    }

    fn region(&self) -> Option<CaptureRegion> {
        self.region
    }

    fn is_active(&self) -> bool {
        self.active
    }

    async fn initialize(&mut self) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| Error::Capture(format!("{}: {e}", self.path.display())))?;
        if !metadata.is_file() {
            return Err(Error::Capture(format!(
                "{} is not a file",
                self.path.display()
            )));
        }

        tracing::info!("Capturing frames from {}", self.path.display());
        self.active = true;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        if !self.active {
            return Err(Error::NotInitialized("capture surface"));
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::Capture(format!("{}: {e}", self.path.display())))?;
        let region = self.region;

        tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&bytes)
                .map_err(|e| Error::Capture(format!("failed to decode frame: {e}")))?
                .to_rgba8();
            let image = crop(image, region, (0, 0))?;
            Snapshot::from_image(&image)
        })
        .await
        .map_err(|e| Error::Capture(format!("capture task failed: {e}")))?
    }

    async fn stop(&mut self) {
        if self.active {
            tracing::debug!("Released {}", self.path.display());
        }
        self.active = false;
    }
}

/// Cut `region` (in the same coordinate space as `origin`) out of `image`.
/// The region is clamped to the image; no overlap at all is an error.
pub fn crop(
    image: RgbaImage,
    region: Option<CaptureRegion>,
    origin: (i32, i32),
) -> Result<RgbaImage> {
    let Some(region) = region else {
        return Ok(image);
    };

    let left = i64::from(region.x) - i64::from(origin.0);
    let top = i64::from(region.y) - i64::from(origin.1);
    let right = (left + i64::from(region.width)).min(i64::from(image.width()));
    let bottom = (top + i64::from(region.height)).min(i64::from(image.height()));
    let left = left.max(0);
    let top = top.max(0);

    if right <= left || bottom <= top {
        return Err(Error::Capture(format!(
            "region {}x{}+{}+{} lies outside the {}x{} frame",
            region.width,
            region.height,
            region.x,
            region.y,
            image.width(),
            image.height()
        )));
    }

    // Bounds were clamped to the image above, so these fit in u32
    Ok(image::imageops::crop_imm(
        &image,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
    .to_image())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| Error::Capture(format!("failed to encode PNG: {e}")))?;
    Ok(buffer.into_inner())
}

#[cfg(feature = "screen")]
pub use self::screen::ScreenSurface;

#[cfg(feature = "screen")]
mod screen {
    use chartwatch_core::{Error, Result};
    use chartwatch_types::CaptureRegion;
    use image::RgbaImage;
    use xcap::{Monitor, Window};

    use super::{CaptureSurface, Snapshot, crop};

    #[derive(Debug, Clone)]
    enum Target {
        PrimaryMonitor,
        /// Case-insensitive partial title match
        Window(String),
    }

    /// Live capture of the primary monitor or one window
    pub struct ScreenSurface {
        target: Target,
        region: Option<CaptureRegion>,
        active: bool,
    }

    impl ScreenSurface {
        pub fn primary_monitor(region: Option<CaptureRegion>) -> Self {
            Self {
                target: Target::PrimaryMonitor,
                region,
                active: false,
            }
        }

        pub fn window(title: impl Into<String>, region: Option<CaptureRegion>) -> Self {
            Self {
                target: Target::Window(title.into()),
                region,
                active: false,
            }
        }
    }

    fn capture(target: &Target, region: Option<CaptureRegion>) -> Result<RgbaImage> {
        let (captured, origin) = match target {
            Target::PrimaryMonitor => {
                let monitors = Monitor::all()
                    .map_err(|e| Error::Capture(format!("failed to get monitors: {e}")))?;
                let monitor = monitors
                    .first()
                    .ok_or_else(|| Error::Capture("no monitor found".to_string()))?;
                let image = monitor
                    .capture_image()
                    .map_err(|e| Error::Capture(format!("failed to capture screen: {e}")))?;
                (image, (monitor.x(), monitor.y()))
            }
            Target::Window(title) => {
                let needle = title.to_lowercase();
                let windows = Window::all()
                    .map_err(|e| Error::Capture(format!("failed to enumerate windows: {e}")))?;
                let window = windows
                    .into_iter()
                    .find(|w| !w.is_minimized() && w.title().to_lowercase().contains(&needle))
                    .ok_or_else(|| Error::Capture(format!("no window matching '{title}'")))?;
                let image = window
                    .capture_image()
                    .map_err(|e| Error::Capture(format!("failed to capture window: {e}")))?;
                // Window regions are relative to the window itself
                (image, (0, 0))
            }
        };

        let (width, height) = (captured.width(), captured.height());
        let image = RgbaImage::from_raw(width, height, captured.into_raw())
            .ok_or_else(|| Error::Capture("captured frame has an invalid size".to_string()))?;
        crop(image, region, origin)
    }

    #[async_trait::async_trait]
    impl CaptureSurface for ScreenSurface {
        fn label(&self) -> &str {
            match self.target {
                Target::PrimaryMonitor => "screen",
                Target::Window(_) => "window",
            }
        }

        fn app_name(&self) -> Option<String> {
            match &self.target {
                Target::PrimaryMonitor => None,
                Target::Window(title) => Some(title.clone()),
            }
        }

        fn region(&self) -> Option<CaptureRegion> {
            self.region
        }

        fn is_active(&self) -> bool {
            self.active
        }

        async fn initialize(&mut self) -> Result<()> {
            let target = self.target.clone();
            let region = self.region;

            // Taking one frame proves the capture permission and target are usable
            tokio::task::spawn_blocking(move || capture(&target, region))
                .await
                .map_err(|e| Error::Capture(format!("capture task failed: {e}")))??;

            tracing::info!("Screen capture ready ({:?})", self.target);
            self.active = true;
            Ok(())
        }

        async fn snapshot(&self) -> Result<Snapshot> {
            if !self.active {
                return Err(Error::NotInitialized("capture surface"));
            }

            let target = self.target.clone();
            let region = self.region;
            tokio::task::spawn_blocking(move || {
                let image = capture(&target, region)?;
                Snapshot::from_image(&image)
            })
            .await
            .map_err(|e| Error::Capture(format!("capture task failed: {e}")))?
        }

        async fn stop(&mut self) {
            self.active = false;
        }
    }
}
