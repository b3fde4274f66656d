//! SSE server listener
//!
//! Binds the HTTP listener, serves the subscribe and publish endpoints, and
//! closes every subscriber channel on shutdown so long-lived streams end.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::{RegistryConfig, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::server::routes::{self, AppState};

/// SSE broadcast server
pub struct SseServer {
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    next_session_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SseServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        Self::with_registry(config, Arc::new(SubscriberRegistry::with_config(registry_config)))
    }

    /// Create a server around an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<SubscriberRegistry>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            next_session_id: Arc::new(AtomicU64::new(1)),
            connection_semaphore,
        }
    }

    /// Get a reference to the subscriber registry
    ///
    /// In-process producers call `broadcast` on it directly.
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the HTTP router without serving it
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            session: self.config.session.clone(),
            body_buffer: self.config.body_buffer,
            next_session_id: Arc::clone(&self.next_session_id),
            connection_semaphore: self.connection_semaphore.clone(),
        };
        routes::router(&self.config, state)
    }

    /// Run the server
    ///
    /// This method runs until the process exits.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown every subscriber channel is closed, so sessions end and
    /// their responses complete.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            subscribe = %self.config.subscribe_path,
            publish = %self.config.publish_path,
            "SSE server listening"
        );

        let stats_handle = self.spawn_stats_task();

        let registry = Arc::clone(&self.registry);
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            registry.close_all();
        };

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await;

        // Stop stats task on shutdown
        if let Some(handle) = stats_handle {
            handle.abort();
        }

        tracing::info!(addr = %local_addr, "SSE server stopped");
        result.map_err(Into::into)
    }

    /// Spawn the periodic registry stats logger
    fn spawn_stats_task(&self) -> Option<tokio::task::JoinHandle<()>> {
        let interval = self.config.stats_interval;
        if interval.is_zero() {
            return None;
        }

        let registry = Arc::clone(&self.registry);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let stats = registry.stats();
                tracing::info!(
                    subscribers = stats.active_subscribers,
                    chunks = stats.chunks_broadcast,
                    bytes = stats.bytes_broadcast,
                    deliveries = stats.deliveries,
                    drops = stats.drops,
                    drop_ratio = stats.drop_ratio(),
                    "Registry stats"
                );
            }
        }))
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
