//! # HTTP Server Module
//!
//! Wires the HTTP surface together:
//! - `ServerState`, the shared handle every handler and middleware receives through axum state
//! - `ServerState::invoke`, the single template through which every remote call is made
//! - `build_app`, which stacks the ambient layers around the routes
//! - `GatewayServer`, which binds the listener and drains in-flight requests on shutdown

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    Router,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::{metadata::MetadataValue, Request, Status};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::auth::middleware::BearerAuth;
use crate::core::classifier::{classify, deadline_exceeded, Operation};
use crate::core::config::{GatewayConfig, ServerConfig};
use crate::core::error::{ConfigError, GatewayResult};
use crate::core::types::ProcessingContext;
use crate::gateway::routes::build_router;
use crate::middleware::context::request_context;
use crate::middleware::error_handling::handle_panic;
use crate::protocols::grpc::IdentityClient;

/// Metadata key carrying the request id to the user service
const REQUEST_ID_METADATA: &str = "x-request-id";

/// Shared server state
///
/// Cloned into every request; all fields are cheap handles.
#[derive(Clone)]
pub struct ServerState {
    client: Arc<dyn IdentityClient>,
    auth: Arc<BearerAuth>,
    call_timeout: Duration,
    request_timeout: Duration,
}

impl ServerState {
    pub fn new(client: Arc<dyn IdentityClient>, config: &GatewayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            auth: Arc::new(BearerAuth::from_settings(&config.auth)?),
            call_timeout: config.backend.call_timeout,
            request_timeout: config.server.request_timeout,
        })
    }

    pub fn client(&self) -> &dyn IdentityClient {
        self.client.as_ref()
    }

    pub fn auth(&self) -> &BearerAuth {
        &self.auth
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Make one remote call on behalf of a request
    ///
    /// The call gets `min(call_timeout, time left on the request)`. The deadline travels to
    /// the backend as `grpc-timeout` and is enforced locally as well; when it elapses the call
    /// future is dropped, which cancels the stream. Failures come back already classified.
    pub async fn invoke<M, R, F, Fut>(
        &self,
        context: &ProcessingContext,
        operation: &Operation,
        message: M,
        call: F,
    ) -> GatewayResult<R>
    where
        F: FnOnce(Request<M>) -> Fut,
        Fut: Future<Output = Result<R, Status>>,
    {
        let budget = context.call_budget(self.call_timeout);
        if budget.is_zero() {
            warn!(
                request_id = %context.request_id,
                operation = operation.name,
                "Request deadline passed before remote call"
            );
            return Err(deadline_exceeded(operation));
        }

        let mut request = Request::new(message);
        request.set_timeout(budget);
        if let Ok(value) = MetadataValue::try_from(context.request_id.as_str()) {
            request.metadata_mut().insert(REQUEST_ID_METADATA, value);
        }

        let started = std::time::Instant::now();
        match tokio::time::timeout(budget, call(request)).await {
            Ok(Ok(response)) => {
                debug!(
                    request_id = %context.request_id,
                    operation = operation.name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Remote call succeeded"
                );
                Ok(response)
            }
            Ok(Err(status)) => {
                let error = classify(operation, &status);
                warn!(
                    request_id = %context.request_id,
                    operation = operation.name,
                    code = ?status.code(),
                    backend_message = status.message(),
                    kind = error.kind().as_str(),
                    "Remote call failed"
                );
                Err(error)
            }
            Err(_) => {
                warn!(
                    request_id = %context.request_id,
                    operation = operation.name,
                    budget_ms = budget.as_millis() as u64,
                    "Remote call exceeded its deadline"
                );
                Err(deadline_exceeded(operation))
            }
        }
    }
}

/// Assemble the routes and the ambient layers
///
/// Outermost first: panic recovery, `TraceLayer`, body limit, then the request context
/// (id, overall deadline, access log).
pub fn build_app(state: ServerState, config: &ServerConfig) -> Router {
    build_router(state.clone()).layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(config.max_body_size))
            .layer(from_fn_with_state(state, request_context)),
    )
}

/// The gateway HTTP server
pub struct GatewayServer {
    config: GatewayConfig,
    app: Router,
}

impl GatewayServer {
    /// Build the server around an already connected identity client
    ///
    /// The configuration is validated here as well, so callers that assemble it in code get
    /// the same checks as `GatewayConfig::load`.
    pub fn new(config: GatewayConfig, client: Arc<dyn IdentityClient>) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = ServerState::new(client, &config)?;
        let app = build_app(state, &config.server);
        Ok(Self { config, app })
    }

    /// The fully layered application, for in-process testing
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn bind_addr(&self) -> Option<SocketAddr> {
        self.config.bind_addr()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    ///
    /// Draining is bounded by `server.shutdown_grace_period`; requests still running after
    /// that are dropped.
    pub async fn serve<S>(self, shutdown: S) -> anyhow::Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = self
            .bind_addr()
            .with_context(|| format!("invalid bind address '{}'", self.config.server.bind_address))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!(%addr, "User gateway listening");

        let grace_period = self.config.server.shutdown_grace_period;
        let (draining_tx, draining_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = draining_tx.send(());
            })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            biased;
            result = &mut server => result.context("server error")?,
            _ = draining_rx => {
                info!(grace_period = ?grace_period, "Draining in-flight requests");
                match tokio::time::timeout(grace_period, &mut server).await {
                    Ok(result) => result.context("server error")?,
                    Err(_) => warn!("Grace period elapsed, dropping remaining requests"),
                }
            }
        }

        info!("User gateway stopped");
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
