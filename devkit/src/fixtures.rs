/*!
Builders for `stats.cgi` documents

Provides:
- A fluent builder for complete status documents
- Per-chain builders with realistic defaults
- A sample S19k Pro document captured from a healthy miner
*/

use serde_json::{json, Map, Value};

/// Fluent builder for a full status document
#[derive(Debug, Clone)]
pub struct StatusBuilder {
    status: String,
    info: Map<String, Value>,
    stats: Map<String, Value>,
    fans: Vec<i64>,
    chains: Vec<Value>,
}

impl StatusBuilder {
    /// Document with header fields filled and no fans or chains
    pub fn new() -> Self {
        let info = json!({
            "miner_version": "uart_trans.1.3",
            "CompileTime": "Thu Feb 29 14:02:12 CST 2024",
            "type": "Antminer S19k Pro"
        });
        let stats = json!({
            "elapsed": 86461,
            "rate_5s": 120345.67,
            "rate_30m": 119876.54,
            "rate_avg": 119950.12,
            "rate_ideal": 120000.0,
            "rate_unit": "GH/s",
            "hwp_total": 0.0003,
            "miner-mode": 0,
            "freq-level": 100
        });

        Self {
            status: "S".to_string(),
            info: info.as_object().cloned().unwrap_or_default(),
            stats: stats.as_object().cloned().unwrap_or_default(),
            fans: Vec::new(),
            chains: Vec::new(),
        }
    }

    pub fn status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = status.into();
        self
    }

    /// Sets an `INFO` entry
    pub fn info<S: Into<String>, V: Into<String>>(mut self, key: S, value: V) -> Self {
        self.info.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Sets a flat `STATS[0]` field
    pub fn stat<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    pub fn fan(mut self, rpm: i64) -> Self {
        self.fans.push(rpm);
        self
    }

    pub fn chain(mut self, chain: ChainBuilder) -> Self {
        self.chains.push(chain.build());
        self
    }

    /// `fan_num`/`chain_num` follow the array lengths unless set with [`StatusBuilder::stat`]
    pub fn build(self) -> Value {
        let mut stats = self.stats;
        stats
            .entry("fan_num")
            .or_insert_with(|| json!(self.fans.len()));
        stats
            .entry("chain_num")
            .or_insert_with(|| json!(self.chains.len()));
        stats.insert("fan".to_string(), json!(self.fans));
        stats.insert("chain".to_string(), Value::Array(self.chains));

        json!({
            "STATUS": {
                "STATUS": self.status,
                "when": 1709186400,
                "Msg": "stats",
                "api_version": "1.0.0"
            },
            "INFO": self.info,
            "STATS": [stats]
        })
    }

    /// Serialized body as served by the miner
    pub fn to_body(self) -> String {
        self.build().to_string()
    }
}

impl Default for StatusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One hashing board record
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    fields: Map<String, Value>,
}

impl ChainBuilder {
    pub fn new(index: i64) -> Self {
        let fields = json!({
            "index": index,
            "freq_avg": 590,
            "rate_ideal": 40000.0,
            "rate_real": 39900.5,
            "asic_num": 77,
            "temp_pic": [48, 49, 50, 51],
            "temp_pcb": [52, 53, 58, 57],
            "temp_chip": [67, 68, 73, 72],
            "hw": 0,
            "eeprom_loaded": true,
            "sn": format!("JYZZ3BCBDJAJF{index:04}")
        });
        Self {
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    pub fn set<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn freq_avg(self, mhz: i64) -> Self {
        self.set("freq_avg", json!(mhz))
    }

    pub fn rates(self, real: f64, ideal: f64) -> Self {
        self.set("rate_real", json!(real)).set("rate_ideal", json!(ideal))
    }

    pub fn hw(self, errors: u64) -> Self {
        self.set("hw", json!(errors))
    }

    pub fn temp_chip(self, readings: &[i64]) -> Self {
        self.set("temp_chip", json!(readings))
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Healthy three-board S19k Pro with four fans
pub fn sample_s19k_pro() -> Value {
    StatusBuilder::new()
        .fan(4320)
        .fan(4290)
        .fan(4350)
        .fan(4310)
        .chain(ChainBuilder::new(0).freq_avg(590))
        .chain(ChainBuilder::new(1).freq_avg(595).hw(2))
        .chain(ChainBuilder::new(2).freq_avg(600).temp_chip(&[70, 71, 76, 74]))
        .build()
}
