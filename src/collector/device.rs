//! Device-process discovery via `nvidia-smi`.

use async_trait::async_trait;
use tracing::warn;

use super::tool::run_tool;
use super::{DeviceProcessPair, DeviceProcessSource};

const QUERY_ARGS: &[&str] = &[
    "--query-compute-apps=gpu_uuid,pid",
    "--format=csv,noheader,nounits",
];

/// Reads (gpu_uuid, pid) pairs for running compute apps from `nvidia-smi`.
pub struct NvidiaSmiSource {
    binary: String,
}

impl NvidiaSmiSource {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl DeviceProcessSource for NvidiaSmiSource {
    async fn list_device_processes(&self) -> Vec<DeviceProcessPair> {
        match run_tool(&self.binary, QUERY_ARGS).await {
            Ok(stdout) => parse_compute_apps(&stdout),
            Err(err) => {
                // The scrape itself must not fail; report nothing this cycle.
                warn!("device query failed: {err}");
                Vec::new()
            }
        }
    }
}

/// Parse csv,noheader output: one `uuid, pid` pair per line. Lines that do
/// not split into exactly two fields are skipped, fields are trimmed.
fn parse_compute_apps(output: &str) -> Vec<DeviceProcessPair> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != 2 {
                return None;
            }
            Some(DeviceProcessPair {
                device_id: fields[0].trim().to_string(),
                process_id: fields[1].trim().to_string(),
            })
        })
        .collect()
}
