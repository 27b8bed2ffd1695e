//! Zabbix low-level discovery of chains and fans
//!
//! Produces `{"data": [{"{#CHAINID}": "0"}, ...]}` documents. Discovery
//! output must stay well-formed even when the miner is down, so callers
//! turn any failure into an empty [`LldDocument`].

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::document::StatusDocument;
use crate::error::ResolveError;

/// Sub-resource family to enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    Chains,
    Fans,
}

impl DiscoveryKind {
    /// LLD macro name used as the entry key
    pub fn macro_name(self) -> &'static str {
        match self {
            DiscoveryKind::Chains => "{#CHAINID}",
            DiscoveryKind::Fans => "{#FANID}",
        }
    }

    fn count_key(self) -> &'static str {
        match self {
            DiscoveryKind::Chains => "chain_num",
            DiscoveryKind::Fans => "fan_num",
        }
    }
}

/// Where identifiers come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// One entry per array element (chain `index` field, fan position)
    #[default]
    Enumerate,
    /// One entry per integer in `0..chain_num` / `0..fan_num`
    Count,
}

/// Largest `chain_num`/`fan_num` believed in count mode
pub const MAX_COUNTED: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEntry {
    pub id: String,
}

impl DiscoveryEntry {
    pub fn new(id: impl ToString) -> Self {
        Self { id: id.to_string() }
    }
}

pub fn discover(
    doc: &StatusDocument,
    kind: DiscoveryKind,
    mode: DiscoveryMode,
) -> Result<Vec<DiscoveryEntry>, ResolveError> {
    let entries: Vec<DiscoveryEntry> = match (kind, mode) {
        (_, DiscoveryMode::Count) => {
            let key = kind.count_key();
            let count = doc.stats_count(key)?;
            if count > MAX_COUNTED {
                return Err(ResolveError::CounterOutOfRange {
                    key: key.to_string(),
                    value: count,
                    max: MAX_COUNTED,
                });
            }
            (0..count).map(DiscoveryEntry::new).collect()
        }
        (DiscoveryKind::Chains, DiscoveryMode::Enumerate) => doc
            .chains()?
            .iter()
            .enumerate()
            .map(|(position, chain)| match chain.get("index") {
                Some(Value::String(id)) => DiscoveryEntry::new(id),
                Some(id @ Value::Number(_)) => DiscoveryEntry::new(id),
                _ => DiscoveryEntry::new(position),
            })
            .collect(),
        (DiscoveryKind::Fans, DiscoveryMode::Enumerate) => {
            (0..doc.fans()?.len()).map(DiscoveryEntry::new).collect()
        }
    };

    debug!("Discovered {} {:?}", entries.len(), kind);
    Ok(entries)
}

/// Serialisable LLD payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldDocument {
    pub kind: DiscoveryKind,
    pub entries: Vec<DiscoveryEntry>,
}

impl LldDocument {
    pub fn new(kind: DiscoveryKind, entries: Vec<DiscoveryEntry>) -> Self {
        Self { kind, entries }
    }

    pub fn empty(kind: DiscoveryKind) -> Self {
        Self::new(kind, Vec::new())
    }
}

impl Serialize for LldDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Entry<'a>(&'static str, &'a DiscoveryEntry);

        impl Serialize for Entry<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(self.0, &self.1.id)?;
                map.end()
            }
        }

        let data: Vec<Entry<'_>> = self
            .entries
            .iter()
            .map(|entry| Entry(self.kind.macro_name(), entry))
            .collect();

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("data", &data)?;
        map.end()
    }
}
