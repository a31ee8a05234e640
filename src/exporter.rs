//! Prometheus exposition for the GPU occupancy mapping.

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::collector::{Aggregator, DeviceProcessSource, UserResolver};

pub const METRIC_NAME: &str = "gpu_users";

/// Long-lived exporter owning one registry and one gauge family.
///
/// Each scrape runs a fresh collection cycle; the gauge vec is reset before
/// being refilled, so series from prior cycles are never held over.
pub struct GpuUserExporter<S, R> {
    aggregator: Aggregator<S, R>,
    registry: Registry,
    gpu_users: IntGaugeVec,
}

impl<S, R> GpuUserExporter<S, R>
where
    S: DeviceProcessSource,
    R: UserResolver + 'static,
{
    pub fn new(aggregator: Aggregator<S, R>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let gpu_users = IntGaugeVec::new(
            Opts::new(METRIC_NAME, "Current users occupying GPUs"),
            &["gpu", "user"],
        )?;
        registry.register(Box::new(gpu_users.clone()))?;

        Ok(Self {
            aggregator,
            registry,
            gpu_users,
        })
    }

    /// Run one collection cycle and render the text exposition format:
    /// one gauge sample at 1 per (gpu, user) pair active this cycle.
    pub async fn render(&self) -> Result<String, prometheus::Error> {
        let mapping = self.aggregator.collect().await;

        self.gpu_users.reset();
        for (gpu, users) in &mapping {
            for user in users {
                self.gpu_users
                    .with_label_values(&[gpu.as_str(), user.as_str()])
                    .set(1);
            }
        }

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
