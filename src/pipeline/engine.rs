//! Text-acquisition collaborators.
//!
//! The pipeline core performs no I/O; recognized text and generative output
//! come from engines behind these traits. The orchestrator holds them as
//! `Arc<dyn ...>` and calls them under a per-stage time budget.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Engine call exceeded its {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },

    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    #[error("Cannot reach engine at {0}")]
    Connection(String),

    #[error("Engine returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Engine response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Engine worker stopped before responding")]
    Disconnected,
}

/// Text recognized from a menu image.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredText {
    pub text: String,
    /// Nominal recognition confidence reported by the engine.
    pub confidence: f32,
}

/// Primary text source: fast OCR whose output feeds the heuristic pipeline.
pub trait TextAcquisition: Send + Sync {
    fn name(&self) -> &str;

    fn acquire(&self, image: &[u8]) -> Result<AcquiredText, EngineError>;
}

/// Secondary source: a generative vision model returning structured dishes
/// as raw response text, to be checked by the strict parser.
pub trait GenerativeEngine: Send + Sync {
    fn name(&self) -> &str;

    fn extract_dishes(&self, image: &[u8]) -> Result<String, EngineError>;
}

/// Run `call` on a worker thread and give up after `budget`.
///
/// A call that overruns is abandoned, not cancelled: the worker finishes in
/// the background and its result is dropped.
pub fn call_with_budget<T, F>(budget: Duration, call: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        // Receiver may be gone after a timeout
        let _ = tx.send(call());
    });
    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(EngineError::Timeout {
            budget_ms: budget.as_millis() as u64,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
    }
}

// ──────────────────────────────────────────────
// Mock engines (testing)
// ──────────────────────────────────────────────

/// Mock OCR engine returning fixed text.
pub struct MockTextAcquisition {
    result: Result<AcquiredText, EngineError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockTextAcquisition {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            result: Ok(AcquiredText {
                text: text.to_string(),
                confidence,
            }),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: EngineError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextAcquisition for MockTextAcquisition {
    fn name(&self) -> &str {
        "mock-ocr"
    }

    fn acquire(&self, _image: &[u8]) -> Result<AcquiredText, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.result.clone()
    }
}

/// Mock generative engine returning a fixed response string.
pub struct MockGenerativeEngine {
    result: Result<String, EngineError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGenerativeEngine {
    pub fn new(response: &str) -> Self {
        Self {
            result: Ok(response.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: EngineError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerativeEngine for MockGenerativeEngine {
    fn name(&self) -> &str {
        "mock-generative"
    }

    fn extract_dishes(&self, _image: &[u8]) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.result.clone()
    }
}
