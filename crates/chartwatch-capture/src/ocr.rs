use std::process::Stdio;

use chartwatch_core::{Error, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::capture::Snapshot;

/// Text recognition over captured frames.
///
/// `terminate` is idempotent; `recognize` after it fails with
/// [`Error::NotInitialized`].
#[async_trait::async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn initialize(&mut self) -> Result<()>;

    async fn recognize(&self, snapshot: &Snapshot) -> Result<String>;

    async fn terminate(&mut self);

    fn is_ready(&self) -> bool;
}

/// Runs the `tesseract` CLI once per frame, PNG in on stdin, text out on stdout
pub struct TesseractRecognizer {
    program: String,
    language: String,
    ready: bool,
}

impl TesseractRecognizer {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
            ready: false,
        }
    }
}

#[async_trait::async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn initialize(&mut self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--list-langs")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Recognition(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(Error::Recognition(format!(
                "{} --list-langs exited with {}",
                self.program, output.status
            )));
        }

        // Older releases print the list on stderr
        let listing = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !listing.lines().any(|line| line.trim() == self.language) {
            return Err(Error::Recognition(format!(
                "language data '{}' is not installed",
                self.language
            )));
        }

        tracing::info!("Tesseract ready ({})", self.language);
        self.ready = true;
        Ok(())
    }

    async fn recognize(&self, snapshot: &Snapshot) -> Result<String> {
        if !self.ready {
            return Err(Error::NotInitialized("text recognizer"));
        }

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Recognition(format!("failed to run {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&snapshot.png)
                .await
                .map_err(|e| Error::Recognition(format!("failed to send frame: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!("Recognized {} chars", text.chars().count());
        Ok(text)
    }

    async fn terminate(&mut self) {
        if self.ready {
            tracing::debug!("Tesseract released");
        }
        self.ready = false;
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(windows)]
pub use self::windows_ocr::WindowsRecognizer;

#[cfg(windows)]
mod windows_ocr {
    use chartwatch_core::{Error, Result};
    use windows::{
        Globalization::Language,
        Graphics::Imaging::BitmapDecoder,
        Media::Ocr::OcrEngine,
        Storage::Streams::{DataWriter, InMemoryRandomAccessStream},
        core::HSTRING,
    };

    use super::TextRecognizer;
    use crate::capture::Snapshot;
    use crate::com::ComGuard;

    fn winrt(context: &str) -> impl Fn(windows::core::Error) -> Error + '_ {
        move |e| Error::Recognition(format!("{context}: {e}"))
    }

    fn create_engine(language_code: &str) -> Result<OcrEngine> {
        let language = Language::CreateLanguage(&HSTRING::from(language_code))
            .map_err(winrt("failed to create language"))?;
        OcrEngine::TryCreateFromLanguage(&language)
            .map_err(winrt("failed to create OCR engine for language"))
    }

    fn recognize_png(language_code: &str, png: &[u8]) -> Result<String> {
        let _com = ComGuard::initialize()?;
        let engine = create_engine(language_code)?;

        let stream = InMemoryRandomAccessStream::new().map_err(winrt("failed to create stream"))?;
        let writer =
            DataWriter::CreateDataWriter(&stream).map_err(winrt("failed to create writer"))?;
        writer
            .WriteBytes(png)
            .map_err(winrt("failed to write image bytes"))?;
        writer
            .StoreAsync()
            .and_then(|op| op.get())
            .map_err(winrt("failed to store data"))?;
        writer
            .FlushAsync()
            .and_then(|op| op.get())
            .map_err(winrt("failed to flush"))?;
        stream.Seek(0).map_err(winrt("failed to seek"))?;

        let decoder = BitmapDecoder::CreateAsync(&stream)
            .and_then(|op| op.get())
            .map_err(winrt("failed to create decoder"))?;
        let bitmap = decoder
            .GetSoftwareBitmapAsync()
            .and_then(|op| op.get())
            .map_err(winrt("failed to get software bitmap"))?;

        let result = engine
            .RecognizeAsync(&bitmap)
            .and_then(|op| op.get())
            .map_err(winrt("failed to get OCR result"))?;

        Ok(result.Text().map_err(winrt("failed to get text"))?.to_string())
    }

    /// Built-in Windows.Media.Ocr engine
    pub struct WindowsRecognizer {
        language: String,
        ready: bool,
    }

    impl WindowsRecognizer {
        pub fn new(language: impl Into<String>) -> Self {
            Self {
                language: language.into(),
                ready: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl TextRecognizer for WindowsRecognizer {
        async fn initialize(&mut self) -> Result<()> {
            let language = self.language.clone();
            let tag = tokio::task::spawn_blocking(move || -> Result<String> {
                let _com = ComGuard::initialize()?;
                let engine = create_engine(&language)?;
                engine
                    .RecognizerLanguage()
                    .and_then(|lang| lang.LanguageTag())
                    .map(|tag| tag.to_string())
                    .map_err(winrt("failed to get recognizer language"))
            })
            .await
            .map_err(|e| Error::Recognition(format!("OCR task failed: {e}")))??;

            tracing::info!("Windows OCR ready ({tag})");
            self.ready = true;
            Ok(())
        }

        async fn recognize(&self, snapshot: &Snapshot) -> Result<String> {
            if !self.ready {
                return Err(Error::NotInitialized("text recognizer"));
            }

            let language = self.language.clone();
            let png = snapshot.png.clone();
            tokio::task::spawn_blocking(move || recognize_png(&language, &png))
                .await
                .map_err(|e| Error::Recognition(format!("OCR task failed: {e}")))?
        }

        async fn terminate(&mut self) {
            self.ready = false;
        }

        fn is_ready(&self) -> bool {
            self.ready
        }
    }
}
