//! GPU user exporter library
//!
//! Discovers which OS users are occupying GPUs on this host and exposes the
//! mapping as Prometheus gauges: one `gpu_users{gpu,user}` sample at 1 per
//! (device, user) pair active at scrape time.

pub mod collector;
pub mod config;
pub mod exporter;
pub mod server;
