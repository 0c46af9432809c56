//! Generation gate for asynchronous lookup results, and the hover preview
//! built on it.

use serde::{Deserialize, Serialize};
use tabula_core::Value;

use super::cache::LookupOutcome;

/// Identity of one request issued through a [`RequestGate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Hands out request tokens; only the latest token is current.
///
/// Results are applied only when their token is still current, so a fetch
/// that completes after its consumer moved on is dropped rather than
/// cancelled.
#[derive(Debug, Default, Clone)]
pub struct RequestGate {
    generation: u64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, making every earlier one stale
    pub fn issue(&mut self) -> RequestToken {
        self.generation += 1;
        RequestToken(self.generation)
    }

    /// Make every issued token stale
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.generation
    }
}

/// State of the FK hover preview
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreviewState {
    #[default]
    Closed,
    Loading {
        fk_column: String,
        value: Value,
    },
    Ready {
        fk_column: String,
        value: Value,
        outcome: LookupOutcome,
    },
}

/// Preview panel showing the record behind one FK cell
#[derive(Debug, Default)]
pub struct LookupPreview {
    gate: RequestGate,
    state: PreviewState,
}

impl LookupPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, PreviewState::Closed)
    }

    /// Start previewing a cell; the returned token must accompany the result
    pub fn open(&mut self, fk_column: impl Into<String>, value: Value) -> RequestToken {
        let token = self.gate.issue();
        self.state = PreviewState::Loading {
            fk_column: fk_column.into(),
            value,
        };
        token
    }

    /// Apply a fetched outcome. Returns `false` if the request went stale.
    pub fn apply(&mut self, token: RequestToken, outcome: LookupOutcome) -> bool {
        if !self.gate.is_current(token) {
            tracing::debug!(
                generation = token.generation(),
                "dropping stale lookup preview result"
            );
            return false;
        }
        match std::mem::take(&mut self.state) {
            PreviewState::Loading { fk_column, value } => {
                self.state = PreviewState::Ready {
                    fk_column,
                    value,
                    outcome,
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    pub fn close(&mut self) {
        self.gate.invalidate();
        self.state = PreviewState::Closed;
    }
}
