//! Server bootstrap
//!
//! Binds both sockets up front so a bad address fails startup, then runs the
//! ticket listener, the technicians and the HTTP API until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use helpdesk_dispatch::{Dispatcher, TicketListener};
use helpdesk_worker::TechnicianPool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{config::Config, routes::create_router, state::AppState};

pub struct Server {
    config: Config,
    dispatcher: Dispatcher,
    tickets: TicketListener,
    http: TcpListener,
}

impl Server {
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        let dispatcher = Dispatcher::new(config.event_buffer);

        let tickets = TicketListener::bind(
            config.ticket_bind_address,
            dispatcher.clone(),
            config.listener_config(),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to bind ticket listener on {}",
                config.ticket_bind_address
            )
        })?;

        let http = TcpListener::bind(config.bind_address)
            .await
            .with_context(|| format!("Failed to bind HTTP API on {}", config.bind_address))?;

        Ok(Self {
            config,
            dispatcher,
            tickets,
            http,
        })
    }

    pub fn ticket_addr(&self) -> std::io::Result<SocketAddr> {
        self.tickets.local_addr()
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let technicians = Arc::new(TechnicianPool::new(
            self.dispatcher.clone(),
            self.config.work_duration(),
            &shutdown,
        ));
        technicians.hire(self.config.technician_count);

        let listener_task = tokio::spawn(self.tickets.run(shutdown.clone()));

        tracing::info!(
            tickets = %self.config.ticket_bind_address,
            http = %self.config.bind_address,
            technicians = self.config.technician_count,
            "Helpdesk server running"
        );

        let state = AppState::new(
            self.config,
            self.dispatcher,
            Arc::clone(&technicians),
            shutdown.clone(),
        );

        let served = axum::serve(self.http, create_router(state))
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await
            .context("HTTP server failed");

        // Stop everything else even if the HTTP server failed on its own
        shutdown.cancel();
        technicians.shutdown().await;
        if let Err(e) = listener_task.await {
            tracing::error!(error = %e, "Ticket listener task failed");
        }

        tracing::info!("Helpdesk server stopped");
        served
    }
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
