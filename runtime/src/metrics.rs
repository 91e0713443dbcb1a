//! Prometheus metrics for the proxy layer.
//!
//! Proxies count what flows through them, labelled by qualified key:
//! - Mutation commits
//! - Action dispatches
//! - Getter reads
//! - Listener and hook subscriptions
//!
//! # Example
//!
//! ```rust,no_run
//! use typed_store_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Commits, dispatches and getter reads are now recorded
//! println!("{}", server.render().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::counter;

const COMMITS: &str = "store_proxy_commits_total";
const DISPATCHES: &str = "store_proxy_dispatches_total";
const GETTER_READS: &str = "store_proxy_getter_reads_total";
const SUBSCRIPTIONS: &str = "store_proxy_subscriptions_total";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Installs the Prometheus recorder and renders the scrape body.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address scrapes are expected on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the Prometheus recorder cannot be installed.
    ///
    /// # Note
    ///
    /// A recorder that is already installed (e.g., by another test) is not an
    /// error; the server then has no handle to render from.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!(
                        "Metrics recorder already initialized, skipping re-initialization"
                    );
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(COMMITS, "Total number of mutation commits issued through proxies");
    describe_counter!(DISPATCHES, "Total number of action dispatches issued through proxies");
    describe_counter!(GETTER_READS, "Total number of getter reads issued through proxies");
    describe_counter!(
        SUBSCRIPTIONS,
        "Total number of listen, before and after subscriptions opened through proxies"
    );
}

/// Proxy metrics recorder.
pub struct ProxyMetrics;

impl ProxyMetrics {
    /// Record a mutation commit.
    pub fn record_commit(key: &str) {
        counter!(COMMITS, "key" => key.to_string()).increment(1);
    }

    /// Record an action dispatch.
    pub fn record_dispatch(key: &str) {
        counter!(DISPATCHES, "key" => key.to_string()).increment(1);
    }

    /// Record a getter read.
    pub fn record_getter_read(key: &str) {
        counter!(GETTER_READS, "key" => key.to_string()).increment(1);
    }

    /// Record a new listener or hook.
    pub fn record_subscription(key: &str) {
        counter!(SUBSCRIPTIONS, "key" => key.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_proxy_metrics_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        ProxyMetrics::record_commit("cart/add");
        ProxyMetrics::record_dispatch("cart/checkout");
        ProxyMetrics::record_getter_read("cart/total");
        ProxyMetrics::record_subscription("cart/add");

        // Another test may have installed the recorder first; metrics are still
        // recorded globally, there is just no handle here to render from.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains(COMMITS));
            assert!(rendered.contains(DISPATCHES));
            assert!(rendered.contains(GETTER_READS));
            assert!(rendered.contains("key=\"cart/add\""));
        }
    }
}
