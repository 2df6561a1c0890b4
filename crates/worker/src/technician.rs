//! Technician worker loop
//!
//! Claim, notify, work, complete, notify, retire, repeat. The loop only ends
//! when its cancellation token fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use helpdesk_dispatch::{DispatchError, Dispatcher};
use helpdesk_shared::TicketId;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Live counters for one technician
#[derive(Debug, Default)]
pub struct TechnicianStats {
    resolved: AtomicU64,
    current: Mutex<Option<TicketId>>,
}

impl TechnicianStats {
    pub fn resolved(&self) -> u64 {
        self.resolved.load(Ordering::Relaxed)
    }

    /// Ticket being worked on right now
    pub fn current(&self) -> Option<TicketId> {
        *self.current.lock()
    }
}

pub struct Technician {
    name: String,
    dispatcher: Dispatcher,
    work_duration: Duration,
    stats: Arc<TechnicianStats>,
}

impl Technician {
    pub fn new(name: impl Into<String>, dispatcher: Dispatcher, work_duration: Duration) -> Self {
        Self {
            name: name.into(),
            dispatcher,
            work_duration,
            stats: Arc::new(TechnicianStats::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> Arc<TechnicianStats> {
        Arc::clone(&self.stats)
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(technician = %self.name, "Technician started");

        loop {
            let ticket = match self.dispatcher.claim(&self.name, &cancel).await {
                Ok(ticket) => ticket,
                Err(DispatchError::Cancelled) => break,
                Err(e) => {
                    tracing::error!(technician = %self.name, error = %e, "Claim failed");
                    continue;
                }
            };

            *self.stats.current.lock() = Some(ticket.id);
            self.dispatcher.notify(&ticket);
            tracing::info!(
                technician = %self.name,
                ticket_id = %ticket.id,
                priority = %ticket.priority,
                "Working on ticket"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        technician = %self.name,
                        ticket_id = %ticket.id,
                        "Interrupted, ticket stays in progress"
                    );
                    break;
                }
                _ = tokio::time::sleep(self.work_duration) => {}
            }

            match self.dispatcher.complete(ticket.id) {
                Ok(resolved) => {
                    self.dispatcher.notify(&resolved);
                    self.dispatcher.retire(resolved.id);
                    self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // An operator resolved it while we were working
                    tracing::warn!(
                        technician = %self.name,
                        ticket_id = %ticket.id,
                        error = %e,
                        "Could not complete ticket"
                    );
                }
            }
            *self.stats.current.lock() = None;
        }

        tracing::info!(
            technician = %self.name,
            resolved = self.stats.resolved(),
            "Technician stopped"
        );
    }
}
