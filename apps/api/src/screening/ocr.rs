//! OCR Fallback — rasterizes PDF pages and runs text recognition on them.
//!
//! Only invoked when embedded-text extraction of a PDF comes back blank. It is the
//! slowest stage of a request by far, so the whole run is bounded by a timeout and
//! every spawned process is killed when the run is dropped.
//!
//! `AppState` holds an `Arc<dyn OcrEngine>`; tests swap in fakes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::screening::error::ScreeningError;

/// Tunables for the rasterize-then-recognize run.
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// Rasterization resolution. 300 is the lowest that reads small resume fonts reliably.
    pub dpi: u32,
    /// Tesseract language model.
    pub language: String,
    /// Upper bound for one whole run, all pages included.
    pub timeout: Duration,
    pub max_parallel_pages: usize,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            dpi: 300,
            language: "eng".to_string(),
            timeout: Duration::from_secs(120),
            max_parallel_pages: 4,
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
        }
    }
}

/// Recognizes the text of a PDF whose pages carry no text layer.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Returns the recognized text of every page, in page order, joined by a space.
    async fn recognize(&self, pdf: Bytes) -> Result<String, ScreeningError>;
}

/// `pdftoppm` (poppler-utils) for rasterization, `tesseract` for recognition.
pub struct TesseractOcr {
    settings: OcrSettings,
}

impl TesseractOcr {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    async fn run(&self, pdf: &[u8]) -> Result<String, ScreeningError> {
        let started = Instant::now();
        let workdir = tempfile::tempdir()
            .map_err(|e| ScreeningError::OcrUnavailable(format!("no scratch directory: {e}")))?;

        let input = workdir.path().join("resume.pdf");
        tokio::fs::write(&input, pdf).await.map_err(|e| {
            ScreeningError::OcrUnavailable(format!("failed to stage PDF for rasterizer: {e}"))
        })?;

        self.rasterize(&input, &workdir.path().join("page")).await?;

        let pages = rendered_pages(workdir.path()).await?;
        if pages.is_empty() {
            return Err(ScreeningError::OcrUnavailable(
                "rasterizer produced no page images".to_string(),
            ));
        }
        let page_count = pages.len();
        debug!(pages = page_count, dpi = self.settings.dpi, "rasterized PDF");

        let permits = Arc::new(Semaphore::new(self.settings.max_parallel_pages.max(1)));
        let mut tasks = JoinSet::new();
        for (index, image) in pages.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let bin = self.settings.tesseract_bin.clone();
            let language = self.settings.language.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| {
                    ScreeningError::OcrUnavailable(format!("page scheduler closed: {e}"))
                })?;
                let page = recognize_page(&bin, &language, &image, index + 1).await?;
                Ok::<_, ScreeningError>((index, page))
            });
        }

        // Pages finish in any order; reassemble by page index.
        let mut outputs = vec![PageOutput::default(); page_count];
        while let Some(joined) = tasks.join_next().await {
            let (index, page) = joined.map_err(|e| {
                ScreeningError::OcrUnavailable(format!("page recognition task failed: {e}"))
            })??;
            outputs[index] = page;
        }

        let text = assemble(outputs)?;
        info!(
            pages = page_count,
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OCR finished"
        );
        Ok(text)
    }

    async fn rasterize(&self, input: &Path, prefix: &Path) -> Result<(), ScreeningError> {
        let output = Command::new(&self.settings.pdftoppm_bin)
            .arg("-r")
            .arg(self.settings.dpi.to_string())
            .arg("-png")
            .arg(input)
            .arg(prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ScreeningError::OcrUnavailable(format!(
                    "failed to run {}: {e}",
                    self.settings.pdftoppm_bin
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScreeningError::OcrUnavailable(format!(
                "{} exited with {}: {}",
                self.settings.pdftoppm_bin,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, pdf: Bytes) -> Result<String, ScreeningError> {
        let secs = self.settings.timeout.as_secs();
        match tokio::time::timeout(self.settings.timeout, self.run(&pdf)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = secs, "OCR run timed out, page processes killed");
                Err(ScreeningError::OcrTimedOut { secs })
            }
        }
    }
}

/// What one tesseract invocation produced for one page.
#[derive(Debug, Clone, Default)]
struct PageOutput {
    text: String,
    /// Set when tesseract exited non-zero.
    failure: Option<String>,
}

async fn recognize_page(
    bin: &str,
    language: &str,
    image: &Path,
    page_number: usize,
) -> Result<PageOutput, ScreeningError> {
    let output = Command::new(bin)
        .arg(image)
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ScreeningError::OcrUnavailable(format!("failed to run {bin}: {e}")))?;

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(PageOutput {
            text,
            failure: None,
        });
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    warn!(
        page = page_number,
        status = %output.status,
        stderr = %stderr.trim(),
        "tesseract reported an error for page"
    );
    Ok(PageOutput {
        text,
        failure: Some(format!(
            "{bin} exited with {} on page {page_number}: {}",
            output.status,
            stderr.trim()
        )),
    })
}

/// Joins page texts in page order.
///
/// A failed page may still contribute what it printed, but the run as a whole is
/// an engine failure when every page failed or a failed page printed nothing.
fn assemble(pages: Vec<PageOutput>) -> Result<String, ScreeningError> {
    let failed = || pages.iter().filter(|p| p.failure.is_some());
    let all_failed = failed().count() == pages.len();
    let any_failed_blank = failed().any(|p| p.text.trim().is_empty());

    if all_failed || any_failed_blank {
        let first = failed()
            .find_map(|p| p.failure.clone())
            .unwrap_or_else(|| "no pages were recognized".to_string());
        return Err(ScreeningError::OcrUnavailable(first));
    }

    let texts: Vec<String> = pages.into_iter().map(|p| p.text).collect();
    Ok(texts.join(" "))
}

/// Page images written by `pdftoppm`, ordered by page number.
///
/// File names look like `page-1.png` or `page-01.png` (zero padding depends on the
/// page count), so ordering goes by the parsed number rather than the name.
async fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, ScreeningError> {
    let list_error =
        |e: std::io::Error| ScreeningError::OcrUnavailable(format!("cannot list rasterized pages: {e}"));
    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_error)?;

    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "png") {
            continue;
        }
        if let Some(n) = page_number(&path) {
            pages.push((n, path));
        }
    }

    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}
