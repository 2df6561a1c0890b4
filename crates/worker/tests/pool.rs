#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use helpdesk_dispatch::{ClientChannel, Dispatcher};
use helpdesk_shared::{NewTicket, Priority, TicketState};
use helpdesk_worker::TechnicianPool;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn new_ticket(description: &str) -> NewTicket {
    NewTicket::new("Ana", description, None).unwrap()
}

async fn wait_until_resolved(dispatcher: &Dispatcher, count: usize) {
    timeout(WAIT, async {
        while dispatcher.stats().resolved < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("tickets were not resolved in time");
}

#[tokio::test]
async fn test_hire_names_technicians_sequentially() {
    let dispatcher = Dispatcher::new(16);
    let root = CancellationToken::new();
    let pool = TechnicianPool::new(dispatcher, Duration::from_millis(10), &root);

    assert_eq!(pool.hire(2), vec!["Technician-1", "Technician-2"]);
    assert_eq!(pool.hire(1), vec!["Technician-3"]);
    assert_eq!(pool.len(), 3);
    assert!(pool.is_hired("Technician-3"));
    assert!(!pool.is_hired("Technician-4"));

    let roster = pool.roster();
    assert!(roster.iter().all(|t| t.active && t.resolved == 0));

    pool.shutdown().await;
    assert!(pool.roster().iter().all(|t| !t.active));
}

#[tokio::test]
async fn test_pool_resolves_everything() {
    let dispatcher = Dispatcher::new(64);
    let root = CancellationToken::new();
    let pool = TechnicianPool::new(dispatcher.clone(), Duration::from_millis(5), &root);
    pool.hire(3);

    let mut receivers = Vec::new();
    for i in 0..12 {
        let (channel, rx) = ClientChannel::pair();
        dispatcher.submit_with_channel(new_ticket(&format!("consulta {}", i)), channel);
        receivers.push(rx);
    }

    // Counters move only after the final push and retire
    timeout(WAIT, async {
        while pool.roster().iter().map(|t| t.resolved).sum::<u64>() < 12 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("tickets were not resolved in time");
    assert_eq!(dispatcher.stats().resolved, 12);
    assert_eq!(dispatcher.stats().open_channels, 0);

    // Every client saw its own ticket go PENDING, IN_PROGRESS, RESOLVED
    for mut rx in receivers {
        let states: Vec<TicketState> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.ticket().unwrap().state)
            .collect();
        assert_eq!(
            states,
            vec![
                TicketState::Pending,
                TicketState::InProgress,
                TicketState::Resolved
            ]
        );
    }

    pool.shutdown().await;
}

#[tokio::test]
async fn test_single_technician_follows_priority() {
    let dispatcher = Dispatcher::new(64);
    let root = CancellationToken::new();

    // Queue everything before anyone is working
    let low = dispatcher.submit(new_ticket("consulta general"));
    let medium = dispatcher.submit(new_ticket("error de red"));
    let high = dispatcher.submit(new_ticket("urgente: servidor caído"));
    assert_eq!(high.priority, Priority::High);

    let mut feed = dispatcher.events().subscribe();
    let pool = TechnicianPool::new(dispatcher.clone(), Duration::from_millis(5), &root);
    pool.hire(1);
    wait_until_resolved(&dispatcher, 3).await;

    let mut resolved_order = Vec::new();
    while let Ok(event) = feed.try_recv() {
        if event.kind() == "resolved" {
            resolved_order.push(event.ticket().id);
        }
    }
    assert_eq!(resolved_order, vec![high.id, medium.id, low.id]);
    pool.shutdown().await;
}

#[tokio::test]
async fn test_root_cancellation_stops_pool() {
    let dispatcher = Dispatcher::new(16);
    let root = CancellationToken::new();
    let pool = TechnicianPool::new(dispatcher, Duration::from_millis(10), &root);
    pool.hire(2);

    root.cancel();
    timeout(WAIT, async {
        while pool.roster().iter().any(|t| t.active) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    pool.shutdown().await;
}
