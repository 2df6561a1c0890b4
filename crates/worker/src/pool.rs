//! Technician pool
//!
//! Spawns technicians on demand and shuts them all down together.

use std::sync::Arc;
use std::time::Duration;

use helpdesk_dispatch::Dispatcher;
use helpdesk_shared::TicketId;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::technician::{Technician, TechnicianStats};

/// Roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicianStatus {
    pub name: String,
    pub resolved: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_ticket: Option<TicketId>,
    pub active: bool,
}

struct Member {
    name: String,
    stats: Arc<TechnicianStats>,
    /// Taken on shutdown
    handle: Option<JoinHandle<()>>,
}

pub struct TechnicianPool {
    dispatcher: Dispatcher,
    work_duration: Duration,
    cancel: CancellationToken,
    members: Mutex<Vec<Member>>,
}

impl TechnicianPool {
    /// Technicians stop when `parent` is cancelled or on [`shutdown`](Self::shutdown)
    pub fn new(dispatcher: Dispatcher, work_duration: Duration, parent: &CancellationToken) -> Self {
        Self {
            dispatcher,
            work_duration,
            cancel: parent.child_token(),
            members: Mutex::new(Vec::new()),
        }
    }

    /// Start `count` more technicians, returning their names
    pub fn hire(&self, count: usize) -> Vec<String> {
        let mut members = self.members.lock();
        let mut hired = Vec::with_capacity(count);

        for _ in 0..count {
            let name = format!("Technician-{}", members.len() + 1);
            let technician = Technician::new(&name, self.dispatcher.clone(), self.work_duration);
            let stats = technician.stats();
            let handle = tokio::spawn(technician.run(self.cancel.clone()));

            members.push(Member {
                name: name.clone(),
                stats,
                handle: Some(handle),
            });
            hired.push(name);
        }

        tracing::info!(hired = count, total = members.len(), "Technicians hired");
        hired
    }

    pub fn roster(&self) -> Vec<TechnicianStatus> {
        self.members
            .lock()
            .iter()
            .map(|member| TechnicianStatus {
                name: member.name.clone(),
                resolved: member.stats.resolved(),
                current_ticket: member.stats.current(),
                active: member.handle.as_ref().is_some_and(|h| !h.is_finished()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `name` is on the roster
    pub fn is_hired(&self, name: &str) -> bool {
        self.members.lock().iter().any(|m| m.name == name)
    }

    /// Cancel every technician and wait for them to stop
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handles: Vec<(String, JoinHandle<()>)> = {
            let mut members = self.members.lock();
            members
                .iter_mut()
                .filter_map(|m| m.handle.take().map(|handle| (m.name.clone(), handle)))
                .collect()
        };

        for (name, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(technician = %name, error = %e, "Technician task failed");
            }
        }
        tracing::info!("Technician pool stopped");
    }
}
