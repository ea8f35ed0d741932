mod cors;
mod health;

use std::net::SocketAddr;

use axum::Router;
use narrate_config::{Config, DeliveryConfig};
use narrate_jobs::RetentionSweeper;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    sweeper: Option<RetentionSweeper>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the job runner cannot be initialized or a
    /// delivery duration is malformed
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let runner = narrate_jobs::build_runner(config)?;

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Synthesis routes
        app = app.merge(narrate_jobs::endpoint_router().with_state(runner));

        // Published audio
        let mut sweeper = None;
        if let DeliveryConfig::Referenced(ref referenced) = config.delivery {
            let prefix = referenced.url_prefix.trim_end_matches('/');
            app = app.nest_service(prefix, ServeDir::new(&referenced.public_dir));

            if let Some(retention) = referenced.retention_duration()? {
                sweeper = Some(RetentionSweeper::new(
                    &referenced.public_dir,
                    retention,
                    referenced.sweep_interval_duration()?,
                ));
            }

            tracing::debug!(
                public_dir = %referenced.public_dir.display(),
                url_prefix = prefix,
                retention = ?referenced.retention,
                "serving published audio"
            );
        }

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
            sweeper,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Override the listen address, e.g. from the command line
    #[must_use]
    pub const fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. In-flight jobs are
    /// allowed to finish before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails
    pub async fn serve_on(
        self,
        listener: tokio::net::TcpListener,
        shutdown: tokio_util::sync::CancellationToken,
    ) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        if let Some(sweeper) = self.sweeper {
            tokio::spawn(sweeper.run(shutdown.child_token()));
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
