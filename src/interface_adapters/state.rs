use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::client::ClientHandle;
use crate::domain::ports::UgiResolver;
use crate::use_cases::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub ugi_resolver: Arc<dyn UgiResolver>,
    next_handle: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, ugi_resolver: Arc<dyn UgiResolver>) -> Self {
        Self {
            engine,
            ugi_resolver,
            next_handle: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocates the next `ClientHandle`, unique for the life of the process.
    pub fn next_handle(&self) -> ClientHandle {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}
