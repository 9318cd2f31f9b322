//! Session state and the status indicator derived from it.
//!
//! One `Session` owns everything the orchestrator needs to gate requests:
//! whether a repository is loaded, which path, and whether an ask call is in
//! flight. The status view is derived state; every transition recomputes it,
//! nothing else writes it.

use std::time::{Duration, Instant};

use serde::Deserialize;

/// Display-only index statistics, overwritten wholesale on every successful
/// load or status probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RepoStats {
    #[serde(default)]
    pub unique_files: u64,
    #[serde(default)]
    pub total_chunks: u64,
    #[serde(default)]
    pub total_vectors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    None,
    Loading,
    Loaded,
    Error,
}

/// The single visible status indicator: kind plus display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub kind: StatusKind,
    pub text: String,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            kind: StatusKind::None,
            text: "No repository loaded".to_string(),
        }
    }
}

/// How long an error status lingers before reverting to neutral, when no
/// repository is loaded yet.
const ERROR_REVERT_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
pub struct Session {
    pub repository_loaded: bool,
    /// True strictly between the start and end of an in-flight ask call.
    pub is_loading: bool,
    pub current_path: Option<String>,
    pub stats: Option<RepoStats>,
    status: StatusView,
    /// Pending reversion to the neutral status after an early error.
    revert_at: Option<Instant>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    /// Chat submission gate: a repository is loaded and no ask is in flight.
    pub fn can_ask(&self) -> bool {
        self.repository_loaded && !self.is_loading
    }

    pub fn set_loading(&mut self, text: &str) {
        self.revert_at = None;
        self.status = StatusView {
            kind: StatusKind::Loading,
            text: text.to_string(),
        };
    }

    /// A load succeeded or the bootstrap probe replayed a loaded repository.
    /// `repository_loaded` never reverts once set; there is no unload.
    pub fn set_loaded(&mut self, path: &str, stats: RepoStats) {
        self.revert_at = None;
        self.repository_loaded = true;
        self.current_path = Some(path.to_string());
        self.stats = Some(stats);
        self.status = StatusView {
            kind: StatusKind::Loaded,
            text: format!("Loaded: {path}"),
        };
    }

    /// Surface an error without touching `repository_loaded`. While nothing
    /// is loaded yet the error reverts to neutral after a fixed delay;
    /// re-arming the timer is idempotent and any later transition cancels it.
    pub fn set_error(&mut self, message: &str, now: Instant) {
        self.status = StatusView {
            kind: StatusKind::Error,
            text: message.to_string(),
        };
        self.revert_at = if self.repository_loaded {
            None
        } else {
            Some(now + ERROR_REVERT_AFTER)
        };
    }

    pub fn clear(&mut self) {
        self.revert_at = None;
        self.status = StatusView::default();
    }

    /// Tick the revert timer. Returns true when the status changed.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        match self.revert_at {
            Some(deadline) if now >= deadline => {
                self.clear();
                true
            }
            _ => false,
        }
    }
}
