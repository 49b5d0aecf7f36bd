//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router from application routes
//! - Wire up middleware (request ID, access log, rate limit, recovery, CORS, timeout)
//! - Bind the listener on `start`, serve on a supervised task
//! - Drain on `stop` via Axum's graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use axum::Router;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, CorsConfig, HttpConfig, RateLimitConfig};
use crate::db::Database;
use crate::http::request::{AccessLog, UuidRequestId};
use crate::lifecycle::subsystem::AbortOnDrop;
use crate::lifecycle::{Shutdown, StartError, StopError, Subsystem};
use crate::security::{cors_layer, rate_limit_middleware, RateLimiterState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub app_name: Arc<str>,
}

/// HTTP listener subsystem.
pub struct HttpServer {
    bind_address: String,
    http: HttpConfig,
    rate_limit: RateLimitConfig,
    cors: CorsConfig,
    state: AppState,
    routes: Option<Router<AppState>>,
    local_addr: Option<SocketAddr>,
    shutdown: Shutdown,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &AppConfig, db: Database) -> Self {
        Self {
            bind_address: config.app.bind_address(),
            http: config.http.clone(),
            rate_limit: config.rate_limit.clone(),
            cors: config.cors.clone(),
            state: AppState {
                db,
                app_name: Arc::from(config.app.name.as_str()),
            },
            routes: Some(Router::new()),
            local_addr: None,
            shutdown: Shutdown::new(),
            task: None,
        }
    }

    /// Merge application routes into the server.
    pub fn routes(mut self, routes: Router<AppState>) -> Self {
        let merged = self.routes.take().unwrap_or_default().merge(routes);
        self.routes = Some(merged);
        self
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&mut self) -> Router {
        let routes = self.routes.take().unwrap_or_default();
        let limiter = Arc::new(RateLimiterState::new(&self.rate_limit));
        let server_header = HeaderValue::from_str(&self.http.server_header)
            .unwrap_or_else(|_| HeaderValue::from_static("Axum"));

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(AccessLog)
                    .on_response(AccessLog),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetResponseHeaderLayer::overriding(header::SERVER, server_header))
            .layer(CatchPanicLayer::new())
            .layer(cors_layer(&self.cors))
            .layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(self.http.request_timeout_secs)));

        routes.with_state(self.state.clone()).layer(middleware)
    }

    async fn bind(&self) -> Result<TcpListener, StartError> {
        let addr: SocketAddr = self
            .bind_address
            .parse()
            .map_err(|_| StartError::Address(self.bind_address.clone()))?;

        TcpListener::bind(addr)
            .await
            .map_err(|source| StartError::Bind { addr, source })
    }
}

impl Subsystem for HttpServer {
    fn name(&self) -> &str {
        "http"
    }

    fn start(&mut self) -> BoxFuture<'_, Result<(), StartError>> {
        async move {
            let listener = self.bind().await?;
            let addr = listener.local_addr().map_err(|e| StartError::Other(e.to_string()))?;
            self.local_addr = Some(addr);

            let app = self
                .build_router()
                .into_make_service_with_connect_info::<SocketAddr>();
            let mut shutdown = self.shutdown.subscribe();
            let app_name = self.state.app_name.clone();

            tracing::info!(address = %addr, app = %app_name, "HTTP server starting");

            self.task = Some(tokio::spawn(async move {
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(async move { shutdown.recv().await })
                    .await;

                match &result {
                    Ok(()) => tracing::info!("HTTP server stopped"),
                    Err(e) => tracing::error!(error = %e, "HTTP server failed"),
                }
                result
            }));
            Ok(())
        }
        .boxed()
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, Result<(), StopError>> {
        let this = *self;
        async move {
            this.shutdown.trigger();
            let Some(task) = this.task else {
                return Ok(());
            };

            // Aborting closes the listener if the handle gives up on us.
            let mut task = AbortOnDrop(task);
            match (&mut task.0).await {
                Ok(result) => result.map_err(StopError::from),
                Err(e) => Err(StopError::Other(e.to_string())),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.app.name = "test".into();
        config.app.host = "127.0.0.1".into();
        config.app.port = 0;
        config.database.host = "127.0.0.1".into();
        config.database.port = 3306;
        config
    }

    #[tokio::test]
    async fn test_start_binds_ephemeral_port() {
        let config = config();
        let db = Database::connect_lazy(&config.database);
        let mut server = HttpServer::new(&config, db);

        server.start().await.unwrap();
        let addr = server.local_addr().expect("bound address");
        assert_ne!(addr.port(), 0);

        Box::new(server).stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_address_is_start_error() {
        let mut config = config();
        config.app.host = "not-an-ip".into();
        let db = Database::connect_lazy(&config.database);
        let mut server = HttpServer::new(&config, db);

        assert!(matches!(server.start().await, Err(StartError::Address(_))));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_ok() {
        let config = config();
        let db = Database::connect_lazy(&config.database);
        let server = HttpServer::new(&config, db);
        Box::new(server).stop().await.unwrap();
    }
}
