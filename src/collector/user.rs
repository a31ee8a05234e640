//! Process-owner resolution via `ps`.

use async_trait::async_trait;
use tracing::debug;

use super::tool::run_tool;
use super::UserResolver;

/// Resolves a pid to its owning user with `ps -o user= -p <pid>`.
///
/// No caching: GPU processes are short-lived, so every cycle re-resolves
/// every pid it observes.
pub struct PsUserResolver {
    binary: String,
}

impl PsUserResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl UserResolver for PsUserResolver {
    async fn resolve_user(&self, process_id: &str) -> Option<String> {
        match run_tool(&self.binary, &["-o", "user=", "-p", process_id]).await {
            Ok(stdout) => {
                let user = stdout.trim();
                if user.is_empty() {
                    None
                } else {
                    Some(user.to_string())
                }
            }
            Err(err) => {
                // Routine between discovery and lookup: the process may
                // already be gone. Treated the same as any tool failure.
                debug!("user lookup for pid {process_id} failed: {err}");
                None
            }
        }
    }
}
