use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const OUTCOME_CACHED: &str = "cached";
pub const OUTCOME_ACQUIRED: &str = "acquired";
pub const OUTCOME_REFRESHED: &str = "refreshed";
pub const OUTCOME_FAILED: &str = "failed";
pub const OUTCOME_OK: &str = "ok";

pub const FLAVOR_CONNINFO: &str = "conninfo";
pub const FLAVOR_HOOK: &str = "before_connect";

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token supplier
    pub token_requests: IntCounterVec,

    // Instance directory
    pub metadata_fetches: IntCounterVec,

    // Providers
    pub provider_invocations: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("cloudsql_connector".into()), None)
            .expect("static metric prefix is valid");

        let metrics: Arc<Metrics> = Arc::new(Self {
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token requests by outcome"), &["outcome"])
                .expect("static metric definition is valid"),
            metadata_fetches: IntCounterVec::new(Opts::new("metadata_fetches_total", "Instance metadata fetches by outcome"), &["outcome"])
                .expect("static metric definition is valid"),
            provider_invocations: IntCounterVec::new(Opts::new("provider_invocations_total", "Connection parameter requests by hook flavor"), &["flavor", "outcome"])
                .expect("static metric definition is valid"),
            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        for collector in [
            metrics.token_requests.clone(),
            metrics.metadata_fetches.clone(),
            metrics.provider_invocations.clone(),
        ] {
            if let Err(err) = reg.register(Box::new(collector)) {
                tracing::warn!("metric registration failed: {}", err);
            }
        }

        metrics
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("metrics encoding failed: {}", err);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
