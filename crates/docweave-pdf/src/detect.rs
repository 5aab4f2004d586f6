//! Cached engine detection
//!
//! Looking for the office suite walks `PATH` and several fixed locations,
//! so the result is kept for the life of the process. [`redetect`] is the
//! only way to refresh it.

use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::office::OfficeRenderer;

static STATUS: Lazy<RwLock<Option<EngineStatus>>> = Lazy::new(|| RwLock::new(None));

/// Whether a PDF engine is usable, and which one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub available: bool,
    /// Engine location, or what to install when none was found
    pub detail: String,
}

/// Probe a renderer without touching the cache
pub fn probe(renderer: &OfficeRenderer) -> EngineStatus {
    match renderer.executable() {
        Some(path) => EngineStatus {
            available: true,
            detail: format!("office suite at {}", path.display()),
        },
        None => EngineStatus {
            available: false,
            detail: "no converter detected (install LibreOffice)".to_string(),
        },
    }
}

/// Detected engine, probing on first use
pub fn detect_engine() -> EngineStatus {
    if let Some(status) = STATUS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return status.clone();
    }
    redetect()
}

/// Forget the cached result and probe again
pub fn redetect() -> EngineStatus {
    let status = probe(&OfficeRenderer::new());
    log::debug!("pdf engine: {:?}", status);
    *STATUS.write().unwrap_or_else(PoisonError::into_inner) = Some(status.clone());
    status
}
