//! Antminer Agent - stats.cgi poller for Zabbix-style monitoring
//!
//! This crate polls an Antminer's embedded `/cgi-bin/stats.cgi` endpoint
//! (HTTP Digest auth) and:
//! - Resolves one monitoring item (`STATS.chain.0.temp_chip.2`, `INFO.type`...)
//! - Emits low-level discovery documents for chains and fans
//! - Renders a colorized terminal status report

pub mod client;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod metric;
pub mod report;
pub mod resolve;

pub use client::MinerClient;
pub use config::{AgentConfig, MinerConfig, Thresholds};
pub use discovery::{discover, DiscoveryEntry, DiscoveryKind, DiscoveryMode, LldDocument};
pub use document::StatusDocument;
pub use error::{MinerError, ResolveError};
pub use metric::{ChainField, Dialect, Metric};
pub use resolve::resolve;
