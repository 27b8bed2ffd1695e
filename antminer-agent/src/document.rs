//! Decoded `stats.cgi` response
//!
//! The miner's schema is externally defined and unversioned, so the raw JSON
//! is kept as a [`serde_json::Value`] for path resolution. The typed views
//! ([`StatsSnapshot`], [`ChainStats`]) are only used by the status reporter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResolveError;

/// Read-only status document for a single poll
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDocument {
    raw: Value,
}

impl StatusDocument {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body).map(Self::new)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// `STATUS.STATUS`
    pub fn status(&self) -> Result<&Value, ResolveError> {
        self.raw
            .get("STATUS")
            .and_then(|s| s.get("STATUS"))
            .ok_or(ResolveError::MalformedDocument("missing STATUS.STATUS"))
    }

    /// The `INFO` map
    pub fn info(&self) -> Result<&Map<String, Value>, ResolveError> {
        self.raw
            .get("INFO")
            .and_then(Value::as_object)
            .ok_or(ResolveError::MalformedDocument("INFO is not an object"))
    }

    /// `STATS[0]`, the element carrying every stats field
    pub fn stats(&self) -> Result<&Map<String, Value>, ResolveError> {
        self.raw
            .get("STATS")
            .and_then(Value::as_array)
            .and_then(|stats| stats.first())
            .and_then(Value::as_object)
            .ok_or(ResolveError::MalformedDocument("STATS[0] is not an object"))
    }

    /// `STATS[0].chain`
    pub fn chains(&self) -> Result<&Vec<Value>, ResolveError> {
        self.stats_array("chain")
    }

    /// `STATS[0].fan`
    pub fn fans(&self) -> Result<&Vec<Value>, ResolveError> {
        self.stats_array("fan")
    }

    /// Integer counter from `STATS[0]`, e.g. `chain_num` or `fan_num`
    pub fn stats_count(&self, key: &str) -> Result<u64, ResolveError> {
        self.stats()?
            .get(key)
            .and_then(Value::as_u64)
            .ok_or_else(|| ResolveError::MissingKey(key.to_string()))
    }

    fn stats_array(&self, key: &'static str) -> Result<&Vec<Value>, ResolveError> {
        self.stats()?
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| ResolveError::MissingKey(key.to_string()))
    }

    /// Typed view of `INFO`
    pub fn miner_info(&self) -> Result<MinerInfo, serde_json::Error> {
        MinerInfo::deserialize(self.raw.get("INFO").unwrap_or(&Value::Null))
    }

    /// Typed view of `STATS[0]`
    pub fn snapshot(&self) -> Result<StatsSnapshot, serde_json::Error> {
        let stats = self
            .raw
            .get("STATS")
            .and_then(|s| s.get(0))
            .unwrap_or(&Value::Null);
        StatsSnapshot::deserialize(stats)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerInfo {
    #[serde(rename = "type")]
    pub model: String,
    pub miner_version: String,
    #[serde(rename = "CompileTime")]
    pub compile_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub elapsed: u64,
    pub rate_5s: f64,
    pub rate_30m: f64,
    pub rate_avg: f64,
    pub rate_ideal: f64,
    pub hwp_total: f64,
    #[serde(rename = "miner-mode")]
    pub miner_mode: i64,
    #[serde(rename = "freq-level")]
    pub freq_level: i64,
    pub fan_num: u64,
    pub fan: Vec<i64>,
    pub chain_num: u64,
    pub chain: Vec<ChainStats>,
}

/// One hashing board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainStats {
    pub index: i64,
    pub sn: String,
    pub freq_avg: f64,
    pub rate_real: f64,
    pub rate_ideal: f64,
    pub hw: u64,
    pub asic_num: u64,
    pub temp_chip: Vec<i64>,
    pub temp_pcb: Vec<i64>,
    pub temp_pic: Vec<i64>,
}

impl ChainStats {
    /// Real over ideal hashrate, as a percentage. Zero when the ideal rate is unknown.
    pub fn efficiency(&self) -> f64 {
        if self.rate_ideal > 0.0 {
            self.rate_real / self.rate_ideal * 100.0
        } else {
            0.0
        }
    }
}
