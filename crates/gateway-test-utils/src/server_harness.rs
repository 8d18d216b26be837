//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.
//! The revocation store is in-memory by default; no Redis is needed.

use crate::crypto_fixtures::TEST_JWT_SECRET;
use api_gateway::auth::revocation::mock::InMemoryRevocationStore;
use api_gateway::auth::{AuthenticationPipeline, RevocationCache, RevocationStore, TokenValidator};
use api_gateway::config::Config;
use api_gateway::handlers::proxy::build_upstream_client;
use api_gateway::routes::{self, init_metrics_recorder, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// The process-wide recorder can only be installed once; later callers get
/// an unattached handle.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the API gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let upstream = wiremock::MockServer::start().await;
///     let server = TestGatewayServer::spawn(&upstream.uri()).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

/// Builder for a [`TestGatewayServer`] with non-default settings.
pub struct TestGatewayServerBuilder {
    vars: HashMap<String, String>,
    routes: Vec<String>,
    store: Arc<dyn RevocationStore>,
}

impl TestGatewayServerBuilder {
    /// Route `pattern` to `upstream`. Routes are matched in insertion order.
    pub fn route(mut self, pattern: &str, upstream: &str) -> Self {
        self.routes.push(format!("{pattern}={upstream}"));
        self
    }

    /// Replace the exemption rules (comma-separated patterns).
    pub fn exempt_paths(mut self, patterns: &str) -> Self {
        self.vars
            .insert("AUTH_EXEMPT_PATHS".to_string(), patterns.to_string());
        self
    }

    /// Use a specific revocation store instead of an empty in-memory one.
    pub fn revocation_store(mut self, store: Arc<dyn RevocationStore>) -> Self {
        self.store = store;
        self
    }

    /// Set any other configuration variable.
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Start the server.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn(mut self) -> Result<TestGatewayServer, anyhow::Error> {
        if !self.routes.is_empty() {
            self.vars
                .insert("GATEWAY_ROUTES".to_string(), self.routes.join(","));
        }

        let config = Config::from_vars(&self.vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let pipeline = AuthenticationPipeline::new(
            config.exempt_paths.clone(),
            TokenValidator::new(&config.jwt_secret),
            RevocationCache::new(self.store, config.revocation_timeout),
        );

        let http_client = build_upstream_client(config.request_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to build upstream client: {}", e))?;

        let state = Arc::new(AppState {
            pipeline: Arc::new(pipeline),
            routes: config.routes.clone(),
            http_client,
        });

        // Build routes using the gateway's real route builder
        let app = routes::build_routes(state, test_metrics_handle(), config.request_timeout);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(TestGatewayServer {
            addr,
            config,
            _handle: handle,
        })
    }
}

impl TestGatewayServer {
    /// Start configuring a server with test secrets and an empty in-memory
    /// revocation store.
    pub fn builder() -> TestGatewayServerBuilder {
        let vars = HashMap::from([
            ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
            // Never dialed: the harness injects its own store.
            (
                "REDIS_URL".to_string(),
                "redis://127.0.0.1:1/0".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);

        TestGatewayServerBuilder {
            vars,
            routes: Vec::new(),
            store: Arc::new(InMemoryRevocationStore::new()),
        }
    }

    /// Spawn a server that forwards every path to `upstream`.
    pub async fn spawn(upstream: &str) -> Result<Self, anyhow::Error> {
        Self::builder().route("/**", upstream).spawn().await
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        // Abort the server task so each test releases its port immediately.
        self._handle.abort();
    }
}
