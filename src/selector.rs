use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::session::{DeviceSession, ElementHandle};

/// Selector dialect understood by the automation server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum By {
    /// Exact Android resource-id, e.g. `com.instagram.android:id/password`.
    ResourceId,
    /// `new UiSelector()...` expression evaluated by UiAutomator.
    UiAutomator,
}

impl By {
    /// W3C `using` strategy name for this dialect.
    pub fn strategy(self) -> &'static str {
        match self {
            By::ResourceId => "id",
            By::UiAutomator => "-android uiautomator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub by: By,
    pub query: &'static str,
}

impl Selector {
    pub const fn id(query: &'static str) -> Self {
        Self { by: By::ResourceId, query }
    }

    pub const fn ui(query: &'static str) -> Self {
        Self { by: By::UiAutomator, query }
    }
}

/// Tries `candidates` left to right and returns the first that resolves.
///
/// Each candidate is queried at most once. A server error aborts the scan
/// instead of falling through to the next candidate.
pub fn resolve_first<S: DeviceSession + ?Sized>(
    session: &S,
    candidates: &[Selector],
) -> Result<Option<(Selector, ElementHandle)>> {
    for candidate in candidates {
        if let Some(element) = session.find_by(candidate.by, candidate.query)? {
            return Ok(Some((*candidate, element)));
        }
    }
    Ok(None)
}

/// Re-runs [`resolve_first`] every `interval` until something matches or `timeout` passes.
/// Always makes at least one pass.
pub fn wait_for_any<S: DeviceSession + ?Sized>(
    session: &S,
    candidates: &[Selector],
    timeout: Duration,
    interval: Duration,
) -> Result<Option<(Selector, ElementHandle)>> {
    let start = Instant::now();
    loop {
        if let Some(hit) = resolve_first(session, candidates)? {
            return Ok(Some(hit));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(interval);
    }
}
