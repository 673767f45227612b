use axum::extract::FromRef;

use crate::collection::Dispatcher;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::ServerConfig;

/// Every intent goes through this lock, one at a time.
pub type GuardedDispatcher = Arc<Mutex<Dispatcher>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub dispatcher: GuardedDispatcher,
}

impl ServerState {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            dispatcher: Arc::new(Mutex::new(dispatcher)),
        }
    }
}

impl FromRef<ServerState> for GuardedDispatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
