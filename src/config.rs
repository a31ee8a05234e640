//! Exporter configuration

use std::net::SocketAddr;

/// Exporter configuration. The original deployment ran with everything
/// hard-wired; the listen address and tool paths are surfaced as flags
/// without changing any default behavior.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the metrics endpoint binds to
    pub listen_addr: String,

    /// Device query tool (nvidia-smi or a compatible shim)
    pub nvidia_smi_path: String,

    /// Process-owner query tool
    pub ps_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9102".to_string(),
            nvidia_smi_path: "nvidia-smi".to_string(),
            ps_path: "ps".to_string(),
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("Invalid listen address: {}", self.listen_addr);
        }

        if self.nvidia_smi_path.is_empty() {
            anyhow::bail!("Device query tool path must not be empty");
        }

        if self.ps_path.is_empty() {
            anyhow::bail!("Process query tool path must not be empty");
        }

        Ok(())
    }
}
