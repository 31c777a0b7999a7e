//! Install and fetch events, and the dispatcher that delivers them.
//!
//! A [`ServiceWorker`] receives the two lifecycle events explicitly. The
//! dispatcher spawned by [`spawn_dispatcher`] plays the hosting runtime: it
//! reads events from a channel, holds every later event back until an install
//! has resolved, and runs each fetch in its own task so fetches stay
//! independent of one another.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::cache::{AssetCacheManager, CachedResponse, ResourceRequest};
use crate::error::{CacheError, InstallError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Receiver of runtime-dispatched events.
#[async_trait]
pub trait ServiceWorker: Send + Sync {
    /// Prepare for service. The runtime does not proceed until this resolves.
    async fn on_install(&self) -> std::result::Result<(), InstallError>;

    /// Produce exactly one response for `request`.
    async fn on_fetch(&self, request: ResourceRequest) -> Result<CachedResponse>;
}

#[async_trait]
impl ServiceWorker for AssetCacheManager {
    async fn on_install(&self) -> std::result::Result<(), InstallError> {
        self.install().await?;
        self.activate().await;
        Ok(())
    }

    async fn on_fetch(&self, request: ResourceRequest) -> Result<CachedResponse> {
        self.handle_fetch(request).await
    }
}

/// An inbound event paired with the channel its outcome goes back on.
pub enum WorkerEvent {
    Install {
        respond_to: oneshot::Sender<std::result::Result<(), InstallError>>,
    },
    Fetch {
        request: ResourceRequest,
        respond_to: oneshot::Sender<Result<CachedResponse>>,
    },
}

/// Handle for sending events to a running dispatcher
#[derive(Clone)]
pub struct WorkerHandle {
    event_tx: mpsc::Sender<WorkerEvent>,
}

impl WorkerHandle {
    /// Queue a raw event.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| CacheError::Internal("Worker event channel closed".to_string()))
    }

    /// Dispatch an install event and wait for it to resolve.
    pub async fn install(&self) -> Result<()> {
        let (respond_to, response_rx) = oneshot::channel();
        self.dispatch(WorkerEvent::Install { respond_to }).await?;

        response_rx
            .await
            .map_err(|_| CacheError::Internal("Install event dropped".to_string()))?
            .map_err(CacheError::from)
    }

    /// Dispatch a fetch event and wait for its response.
    pub async fn fetch(&self, request: ResourceRequest) -> Result<CachedResponse> {
        let (respond_to, response_rx) = oneshot::channel();
        self.dispatch(WorkerEvent::Fetch { request, respond_to }).await?;

        response_rx
            .await
            .map_err(|_| CacheError::Internal("Fetch event dropped".to_string()))?
    }
}

/// Start delivering events to `worker` on a background task.
pub fn spawn_dispatcher(worker: Arc<dyn ServiceWorker>, capacity: usize) -> WorkerHandle {
    let (event_tx, mut event_rx) = mpsc::channel::<WorkerEvent>(capacity.max(1));

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                WorkerEvent::Install { respond_to } => {
                    // Awaited inline: queued events wait for the install
                    let result = worker.on_install().await;
                    let _ = respond_to.send(result);
                }
                WorkerEvent::Fetch { request, respond_to } => {
                    let worker = worker.clone();
                    tokio::spawn(async move {
                        let _ = respond_to.send(worker.on_fetch(request).await);
                    });
                }
            }
        }
        debug!("Worker event channel closed, dispatcher exiting");
    });

    WorkerHandle { event_tx }
}
