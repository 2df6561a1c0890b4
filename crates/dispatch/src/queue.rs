//! Priority dispatch queue
//!
//! Holds every ticket ever submitted and lets technicians claim the
//! highest-priority pending one, suspending while there is none.
//!
//! Tickets live in an arena keyed by id. Pending tickets are additionally
//! indexed in one FIFO lane per priority class. Both structures are only
//! touched under the same mutex, so submit, scan and the `PENDING ->
//! IN_PROGRESS` transition are indivisible relative to each other.

use std::collections::{BTreeMap, VecDeque};

use helpdesk_shared::{NewTicket, Priority, Ticket, TicketId, TicketState};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, DispatchResult};

/// Shared queue of tickets
pub struct DispatchQueue {
    inner: Mutex<QueueInner>,
    /// Woken on every submission
    available: Notify,
}

#[derive(Default)]
struct QueueInner {
    last_id: u64,
    /// Ids are monotonic, so key order is also submission order
    tickets: BTreeMap<TicketId, Ticket>,
    /// Indexed by `Priority::rank`
    lanes: [VecDeque<TicketId>; 3],
}

impl QueueInner {
    fn pop_next(&mut self) -> Option<TicketId> {
        self.lanes.iter_mut().find_map(VecDeque::pop_front)
    }

    fn unlink(&mut self, id: TicketId, priority: Priority) {
        self.lanes[priority.rank()].retain(|pending| *pending != id);
    }

    fn ticket_mut(&mut self, id: TicketId) -> DispatchResult<&mut Ticket> {
        self.tickets.get_mut(&id).ok_or(DispatchError::NotFound(id))
    }
}

/// Ticket counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            available: Notify::new(),
        }
    }

    /// Register a ticket and wake blocked claimers
    pub fn submit(&self, new_ticket: NewTicket) -> Ticket {
        self.submit_with(new_ticket, |_| {})
    }

    /// Register a ticket, running `before_publish` once the id is assigned.
    ///
    /// The hook runs inside the critical section, before any claimer can see
    /// the ticket. It must not touch the queue.
    pub fn submit_with<F>(&self, new_ticket: NewTicket, before_publish: F) -> Ticket
    where
        F: FnOnce(&Ticket),
    {
        let ticket = {
            let mut inner = self.inner.lock();
            inner.last_id += 1;
            let id = TicketId(inner.last_id);

            let ticket = new_ticket.into_ticket(id);
            before_publish(&ticket);

            inner.lanes[ticket.priority.rank()].push_back(id);
            inner.tickets.insert(id, ticket.clone());
            ticket
        };

        tracing::info!(
            ticket_id = %ticket.id,
            client = %ticket.client_name,
            priority = %ticket.priority,
            "Ticket registered"
        );

        self.available.notify_waiters();
        ticket
    }

    /// Claim the next ticket without waiting
    pub fn try_claim(&self, technician: &str) -> Option<Ticket> {
        let mut inner = self.inner.lock();

        while let Some(id) = inner.pop_next() {
            let Some(ticket) = inner.tickets.get_mut(&id) else {
                continue;
            };
            match ticket.start(technician) {
                Ok(()) => return Some(ticket.clone()),
                Err(err) => {
                    // Lanes only hold pending ids; skip anything stale
                    tracing::error!(ticket_id = %id, error = %err, "Stale entry in pending lane");
                }
            }
        }

        None
    }

    /// Claim the highest-priority pending ticket, waiting until one exists.
    ///
    /// Returns [`DispatchError::Cancelled`] once `cancel` fires. A ticket is
    /// never claimed after cancellation has been observed.
    pub async fn claim(
        &self,
        technician: &str,
        cancel: &CancellationToken,
    ) -> DispatchResult<Ticket> {
        loop {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            // Register interest before scanning so a submit racing the scan
            // still wakes us.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(ticket) = self.try_claim(technician) {
                tracing::info!(
                    ticket_id = %ticket.id,
                    technician = %technician,
                    priority = %ticket.priority,
                    "Ticket claimed"
                );
                return Ok(ticket);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Force-assign a pending ticket to `technician`
    pub fn assign(&self, id: TicketId, technician: &str) -> DispatchResult<Ticket> {
        let mut inner = self.inner.lock();
        let ticket = inner.ticket_mut(id)?;

        ticket
            .start(technician)
            .map_err(|err| DispatchError::InvalidState {
                id,
                state: err.from,
                expected: TicketState::Pending,
            })?;

        let ticket = ticket.clone();
        inner.unlink(id, ticket.priority);
        Ok(ticket)
    }

    /// `IN_PROGRESS -> RESOLVED`. Any other state is left unchanged.
    pub fn complete(&self, id: TicketId) -> DispatchResult<Ticket> {
        let mut inner = self.inner.lock();
        let ticket = inner.ticket_mut(id)?;

        ticket
            .resolve()
            .map_err(|err| DispatchError::InvalidState {
                id,
                state: err.from,
                expected: TicketState::InProgress,
            })?;

        Ok(ticket.clone())
    }

    pub fn get(&self, id: TicketId) -> DispatchResult<Ticket> {
        let inner = self.inner.lock();
        inner.tickets.get(&id).cloned().ok_or(DispatchError::NotFound(id))
    }

    /// Independent copy of every ticket, in submission order
    pub fn snapshot(&self) -> Vec<Ticket> {
        let inner = self.inner.lock();
        inner.tickets.values().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.lanes.iter().map(VecDeque::len).sum()
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        let mut stats = QueueStats {
            total: inner.tickets.len(),
            ..QueueStats::default()
        };
        for ticket in inner.tickets.values() {
            match ticket.state {
                TicketState::Pending => stats.pending += 1,
                TicketState::InProgress => stats.in_progress += 1,
                TicketState::Resolved => stats.resolved += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn new_ticket(description: &str) -> NewTicket {
        NewTicket::new("Ana", description, None).unwrap()
    }

    fn with_priority(priority: Priority) -> NewTicket {
        NewTicket::new("Ana", "consulta", Some(priority)).unwrap()
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let queue = DispatchQueue::new();
        let first = queue.submit(new_ticket("a"));
        let second = queue.submit(new_ticket("b"));
        assert_eq!(first.id, TicketId(1));
        assert_eq!(second.id, TicketId(2));
        assert_eq!(first.state, TicketState::Pending);
        assert!(first.assigned_technician.is_none());
    }

    #[test]
    fn test_example_scenario_claims_by_priority() {
        let queue = DispatchQueue::new();
        queue.submit(new_ticket("urgente: servidor caído"));
        queue.submit(new_ticket("error de red"));
        queue.submit(new_ticket("consulta general"));

        let order: Vec<Priority> = (0..3)
            .map(|_| queue.try_claim("Technician-1").unwrap().priority)
            .collect();
        assert_eq!(order, vec![Priority::High, Priority::Medium, Priority::Low]);
        assert!(queue.try_claim("Technician-1").is_none());
    }

    #[test]
    fn test_fifo_within_priority_class() {
        let queue = DispatchQueue::new();
        let low = queue.submit(with_priority(Priority::Low));
        let high_a = queue.submit(with_priority(Priority::High));
        let medium = queue.submit(with_priority(Priority::Medium));
        let high_b = queue.submit(with_priority(Priority::High));

        let claimed: Vec<TicketId> = std::iter::from_fn(|| queue.try_claim("T"))
            .map(|t| t.id)
            .collect();
        assert_eq!(claimed, vec![high_a.id, high_b.id, medium.id, low.id]);
    }

    #[test]
    fn test_claim_sets_technician_atomically() {
        let queue = DispatchQueue::new();
        let ticket = queue.submit(new_ticket("consulta"));

        let claimed = queue.try_claim("Technician-7").unwrap();
        assert_eq!(claimed.id, ticket.id);
        assert_eq!(claimed.state, TicketState::InProgress);
        assert_eq!(claimed.assigned_technician.as_deref(), Some("Technician-7"));

        let stored = queue.get(ticket.id).unwrap();
        assert_eq!(stored, claimed);
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let queue = DispatchQueue::new();
        let ticket = queue.submit(new_ticket("consulta"));

        let err = queue.complete(ticket.id).unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidState {
                id: ticket.id,
                state: TicketState::Pending,
                expected: TicketState::InProgress,
            }
        );
        assert_eq!(queue.get(ticket.id).unwrap().state, TicketState::Pending);

        queue.try_claim("T").unwrap();
        let resolved = queue.complete(ticket.id).unwrap();
        assert_eq!(resolved.state, TicketState::Resolved);
        assert_eq!(resolved.assigned_technician.as_deref(), Some("T"));

        // Resolving twice is rejected and leaves the ticket as it was
        assert!(matches!(
            queue.complete(ticket.id),
            Err(DispatchError::InvalidState { state: TicketState::Resolved, .. })
        ));
        assert_eq!(queue.complete(TicketId(99)), Err(DispatchError::NotFound(TicketId(99))));
    }

    #[test]
    fn test_assign_removes_from_pending() {
        let queue = DispatchQueue::new();
        let first = queue.submit(with_priority(Priority::High));
        let second = queue.submit(with_priority(Priority::High));

        let assigned = queue.assign(first.id, "Operator").unwrap();
        assert_eq!(assigned.state, TicketState::InProgress);
        assert_eq!(queue.pending_count(), 1);

        // Workers skip the manually assigned ticket
        assert_eq!(queue.try_claim("T").unwrap().id, second.id);

        // Cannot assign twice
        assert!(matches!(
            queue.assign(first.id, "Someone"),
            Err(DispatchError::InvalidState { state: TicketState::InProgress, .. })
        ));
        assert_eq!(
            queue.get(first.id).unwrap().assigned_technician.as_deref(),
            Some("Operator")
        );
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let queue = DispatchQueue::new();
        queue.submit(new_ticket("a"));
        let mut snapshot = queue.snapshot();
        snapshot[0].state = TicketState::Resolved;
        snapshot.clear();

        let fresh = queue.snapshot();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].state, TicketState::Pending);
    }

    #[test]
    fn test_stats_counts_states() {
        let queue = DispatchQueue::new();
        for _ in 0..3 {
            queue.submit(new_ticket("consulta"));
        }
        let claimed = queue.try_claim("T").unwrap();
        queue.try_claim("T").unwrap();
        queue.complete(claimed.id).unwrap();

        assert_eq!(
            queue.stats(),
            QueueStats {
                total: 3,
                pending: 1,
                in_progress: 1,
                resolved: 1,
            }
        );
    }

    #[test]
    fn test_hook_runs_before_ticket_is_claimable() {
        let queue = Arc::new(DispatchQueue::new());
        let observed = Arc::new(Mutex::new(None));

        let queue_in_hook = Arc::clone(&queue);
        let observed_in_hook = Arc::clone(&observed);
        queue.submit_with(new_ticket("consulta"), move |ticket| {
            assert_eq!(ticket.id, TicketId(1));
            *observed_in_hook.lock() = Some(queue_in_hook.lock_is_free());
        });

        // Nothing was claimable while the hook ran
        assert_eq!(*observed.lock(), Some(false));
        assert_eq!(queue.pending_count(), 1);
    }

    impl DispatchQueue {
        /// False while any caller holds the queue lock
        fn lock_is_free(&self) -> bool {
            self.inner.try_lock().is_some()
        }
    }

    #[tokio::test]
    async fn test_claim_blocks_until_submit() {
        let queue = Arc::new(DispatchQueue::new());
        let cancel = CancellationToken::new();

        let waiter = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.claim("Technician-1", &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        let submitted = queue.submit(new_ticket("consulta"));
        let claimed = timeout(Duration::from_secs(2), waiter)
            .await
            .expect("claim should wake up")
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, submitted.id);
        assert_eq!(claimed.state, TicketState::InProgress);
    }

    #[tokio::test]
    async fn test_claim_is_cancellable() {
        let queue = Arc::new(DispatchQueue::new());
        let cancel = CancellationToken::new();

        let waiter = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.claim("Technician-1", &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = timeout(Duration::from_secs(2), waiter).await.unwrap().unwrap();
        assert_eq!(result, Err(DispatchError::Cancelled));

        // A cancelled claimer never takes work
        queue.submit(new_ticket("consulta"));
        assert_eq!(queue.claim("Technician-1", &cancel).await, Err(DispatchError::Cancelled));
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_get_unique_ids() {
        const N: u64 = 200;
        let queue = Arc::new(DispatchQueue::new());

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    queue.submit(new_ticket(&format!("ticket {}", i))).id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        let expected: HashSet<TicketId> = (1..=N).map(TicketId).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_never_share_a_ticket() {
        const TICKETS: usize = 100;
        const TECHNICIANS: usize = 8;
        let queue = Arc::new(DispatchQueue::new());
        let cancel = CancellationToken::new();

        let claimers: Vec<_> = (0..TECHNICIANS)
            .map(|n| {
                let queue = Arc::clone(&queue);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let name = format!("Technician-{}", n + 1);
                    let mut claimed = Vec::new();
                    while let Ok(ticket) = queue.claim(&name, &cancel).await {
                        assert_eq!(ticket.assigned_technician.as_deref(), Some(name.as_str()));
                        claimed.push(ticket.id);
                    }
                    claimed
                })
            })
            .collect();

        for i in 0..TICKETS {
            queue.submit(new_ticket(&format!("ticket {}", i)));
            if i % 10 == 0 {
                tokio::task::yield_now().await;
            }
        }

        timeout(Duration::from_secs(5), async {
            while queue.stats().in_progress < TICKETS {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("all tickets should be claimed");
        cancel.cancel();

        let mut seen = HashSet::new();
        for claimer in claimers {
            for id in claimer.await.unwrap() {
                assert!(seen.insert(id), "ticket {} claimed twice", id);
            }
        }
        assert_eq!(seen.len(), TICKETS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_priority_holds_under_concurrent_submission() {
        let queue = Arc::new(DispatchQueue::new());

        let submitters: Vec<_> = Priority::ALL
            .into_iter()
            .map(|priority| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut ids = Vec::new();
                    for _ in 0..30 {
                        ids.push(queue.submit(with_priority(priority)).id);
                        tokio::task::yield_now().await;
                    }
                    (priority, ids)
                })
            })
            .collect();

        let mut submitted = Vec::new();
        for submitter in submitters {
            submitted.push(submitter.await.unwrap());
        }

        let claimed: Vec<Ticket> = std::iter::from_fn(|| queue.try_claim("T")).collect();
        assert_eq!(claimed.len(), 90);

        // Never a lower class before a higher one
        for pair in claimed.windows(2) {
            assert!(pair[0].priority.rank() <= pair[1].priority.rank());
        }
        // Within a class, submission order
        for (priority, ids) in submitted {
            let order: Vec<TicketId> = claimed
                .iter()
                .filter(|t| t.priority == priority)
                .map(|t| t.id)
                .collect();
            assert_eq!(order, ids);
        }
    }
}
