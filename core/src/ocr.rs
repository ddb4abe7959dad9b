//! Document OCR adapter.
//!
//! Isolates the third-party recognizer behind a single capability with
//! variants, modeled as one adapter rather than polymorphic recognizer
//! trait objects — a missing recognizer is a startup-time configuration
//! error, not a runtime fallback.

use std::sync::mpsc;
use std::time::Duration;

use crate::error::ExtractError;
use crate::image::OwnedImage;
use crate::token::{Point, Token};

/// The recognizer(s) this adapter can drive. Presently a single backend;
/// the enum shape leaves room for a second recognizer without touching
/// callers, matching how the original switched between two engines at
/// runtime behind one call site.
pub enum OcrBackend {
    DocumentEngine(ocr_rs::OcrEngine),
}

impl OcrBackend {
    pub fn load(
        detection: impl AsRef<std::path::Path>,
        recognition: impl AsRef<std::path::Path>,
        charset: impl AsRef<std::path::Path>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection,
            recognition,
            charset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count,
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.0,
                ..Default::default()
            }),
        )
        .context("failed to initialize OCR engine")?;

        Ok(Self::DocumentEngine(engine))
    }

    /// Run recognition synchronously on the calling thread. Word-level
    /// detections are preferred; callers that only emit paragraph-level
    /// boxes still work, just with coarser tokens.
    fn recognize_blocking(&self, image: &OwnedImage) -> Result<Vec<Token>, ExtractError> {
        let Self::DocumentEngine(engine) = self;
        let view = image.as_image();
        let buf = ocr_rs::preprocess::rgb_to_image(&view.get_bytes(), view.width(), view.height());

        let results = engine
            .recognize(&buf)
            .map_err(|e| ExtractError::OcrFailure(e.to_string()))?;

        Ok(results
            .into_iter()
            .map(|r| {
                let polygon = [
                    Point::new(r.quad[0][0], r.quad[0][1]),
                    Point::new(r.quad[1][0], r.quad[1][1]),
                    Point::new(r.quad[2][0], r.quad[2][1]),
                    Point::new(r.quad[3][0], r.quad[3][1]),
                ];
                Token::new(polygon, r.text, r.confidence)
            })
            .collect())
    }
}

/// Dispatch `backend`'s recognition call, bounded by `timeout`.
///
/// If a Tokio runtime handle is available ("invoked from code already
/// inside an event loop"), the blocking recognizer call runs on a dedicated
/// blocking-pool thread via [`tokio::runtime::Handle::spawn_blocking`] so it
/// never stalls the calling task's worker thread; otherwise it runs on a
/// plain OS thread. Either way the caller blocks on a channel recv with the
/// timeout applied, which doubles as the wall-clock bound.
pub fn recognize(
    backend: std::sync::Arc<OcrBackend>,
    image: OwnedImage,
    timeout: Duration,
) -> Result<Vec<Token>, ExtractError> {
    let (tx, rx) = mpsc::channel();

    let job = move || {
        let result = backend.recognize_blocking(&image);
        let _ = tx.send(result);
    };

    dispatch_blocking(job);

    rx.recv_timeout(timeout)
        .unwrap_or(Err(ExtractError::OcrTimeout(timeout)))
}

/// Runs `job` off the calling thread: on a Tokio blocking-pool thread if a
/// runtime handle is current, otherwise on a plain OS thread.
fn dispatch_blocking<F: FnOnce() + Send + 'static>(job: F) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(job);
        }
        Err(_) => {
            std::thread::spawn(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_fires_when_job_never_sends() {
        let (_tx, rx) = mpsc::channel::<Result<Vec<Token>, ExtractError>>();
        let result: Result<Vec<Token>, ExtractError> = rx
            .recv_timeout(Duration::from_millis(10))
            .unwrap_or(Err(ExtractError::OcrTimeout(Duration::from_millis(10))));
        assert!(matches!(result, Err(ExtractError::OcrTimeout(_))));
    }
}
