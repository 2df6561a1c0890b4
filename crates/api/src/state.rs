//! Shared handler state

use std::sync::Arc;

use helpdesk_dispatch::Dispatcher;
use helpdesk_worker::TechnicianPool;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub technicians: Arc<TechnicianPool>,
    /// Ends long-lived responses such as the event stream
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        dispatcher: Dispatcher,
        technicians: Arc<TechnicianPool>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            technicians,
            shutdown,
        }
    }
}
