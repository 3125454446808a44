// src/request.rs

use crate::store::StoreError;
use tracing::{debug, warn};

/// State of one remote resource as the UI sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Idle,
    Pending,
    Ready(T),
    /// The fetch failed; the user can retry.
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Loadable::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Issued when a request starts; only the most recent one may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

/// A `Loadable` plus the sequence number of the latest request for it.
///
/// Responses carrying an older ticket are dropped, so two overlapping
/// refreshes cannot leave the earlier answer on screen.
#[derive(Debug)]
pub struct Tracked<T> {
    name: &'static str,
    state: Loadable<T>,
    latest: u64,
}

impl<T> Tracked<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Loadable::Idle,
            latest: 0,
        }
    }

    pub fn state(&self) -> &Loadable<T> {
        &self.state
    }

    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        self.state = Loadable::Pending;
        RequestTicket(self.latest)
    }

    /// Apply a response. Returns `false` when the ticket is stale and the
    /// response was discarded.
    pub fn complete(&mut self, ticket: RequestTicket, result: Result<T, StoreError>) -> bool {
        if ticket.0 != self.latest {
            debug!(
                resource = self.name,
                ticket = ticket.0,
                latest = self.latest,
                "Discarding stale response"
            );
            return false;
        }
        self.state = match result {
            Ok(value) => Loadable::Ready(value),
            Err(e) => {
                warn!(resource = self.name, error = %e, "Fetch failed");
                Loadable::Failed(format!("Could not load {}. Try again.", self.name))
            }
        };
        true
    }
}
