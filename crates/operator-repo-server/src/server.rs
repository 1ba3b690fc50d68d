use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use operator_repo_api::ApiError;
use operator_repo_storage::DynStorage;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::identity::IdentityResolver;
use crate::service::OperatorService;
use crate::{config::AppConfig, handlers, middleware as app_middleware};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: OperatorService,
    pub identity: Arc<IdentityResolver>,
    /// Development mode: 5xx bodies keep the underlying error text.
    pub debug: bool,
}

impl AppState {
    pub fn new(cfg: &AppConfig, storage: DynStorage) -> anyhow::Result<Self> {
        let identity = IdentityResolver::from_config(&cfg.identity).map_err(anyhow::Error::msg)?;
        Ok(Self {
            service: OperatorService::new(storage, cfg.registry.clone()),
            identity: Arc::new(identity),
            debug: cfg.server.debug,
        })
    }

    /// Logs a failed request and prepares the error for the client.
    pub fn reject(&self, err: ApiError) -> ApiError {
        if err.status_code().is_server_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        } else {
            tracing::debug!(code = err.code(), error = %err, "request rejected");
        }
        if self.debug { err } else { err.redacted() }
    }
}

pub struct OperatorRepoServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, storage: DynStorage) -> anyhow::Result<Router> {
    let body_limit = cfg.server.body_limit_bytes;
    let state = AppState::new(cfg, storage)?;
    let router = Router::new()
        // Health and schema endpoints
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/doc", get(handlers::doc))
        // Operator registry
        .route(
            "/operator",
            get(handlers::list_operators)
                .put(handlers::create_operator)
                .delete(handlers::delete_operators),
        )
        .route(
            "/operator/{id}",
            get(handlers::read_operator)
                .post(handlers::update_operator)
                .delete(handlers::delete_operator),
        )
        .with_state(state)
        // Middleware stack, innermost first: cors -> compression -> trace -> request id -> body limit
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit));
    Ok(router)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<OperatorRepoServer> {
        let storage = crate::create_storage(&self.config).await?;
        let app = build_app(&self.config, storage)?;

        Ok(OperatorRepoServer {
            addr: self.addr,
            app,
        })
    }
}

impl OperatorRepoServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
