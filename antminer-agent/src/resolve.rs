//! Metric resolution against a status document

use serde_json::Value;
use tracing::debug;

use crate::document::StatusDocument;
use crate::error::ResolveError;
use crate::metric::{Dialect, Metric};

impl Metric {
    /// Looks the metric up in `doc`. Never panics on unexpected shapes.
    pub fn resolve(&self, doc: &StatusDocument) -> Result<Value, ResolveError> {
        match self {
            Metric::Status => doc.status().cloned(),
            Metric::Info(key) => doc
                .info()?
                .get(key)
                .cloned()
                .ok_or_else(|| ResolveError::MissingKey(key.clone())),
            Metric::Stat { key, aliased } => resolve_stat(doc, key, *aliased),
            Metric::Fan(index) => {
                let fans = doc.fans()?;
                fans.get(*index)
                    .cloned()
                    .ok_or(ResolveError::FanOutOfRange { index: *index, len: fans.len() })
            }
            Metric::Chain { index, field, sensor } => {
                let chains = doc.chains()?;
                let chain = chains.get(*index).ok_or(ResolveError::ChainOutOfRange {
                    index: *index,
                    len: chains.len(),
                })?;
                let value = chain
                    .get(field.json_key())
                    .ok_or_else(|| ResolveError::MissingKey(field.json_key().to_string()))?;
                pick_sensor(value, *sensor)
            }
        }
    }
}

/// Parses `path` and resolves it in one step
pub fn resolve(doc: &StatusDocument, path: &str, dialect: Dialect) -> Result<Value, ResolveError> {
    let metric = Metric::parse(path, dialect)?;
    debug!("Resolving {} as {:?}", path, metric);
    metric.resolve(doc)
}

fn resolve_stat(doc: &StatusDocument, key: &str, aliased: bool) -> Result<Value, ResolveError> {
    let stats = doc.stats()?;
    if let Some(value) = stats.get(key) {
        return Ok(value.clone());
    }

    if aliased {
        // miner_mode <-> miner-mode
        for alias in [key.replace('_', "-"), key.replace('-', "_")] {
            if alias != key {
                if let Some(value) = stats.get(&alias) {
                    return Ok(value.clone());
                }
            }
        }
    }

    Err(ResolveError::MissingKey(key.to_string()))
}

/// Arrays collapse to their first element unless a sensor index is given
fn pick_sensor(value: &Value, sensor: Option<usize>) -> Result<Value, ResolveError> {
    match (value, sensor) {
        (Value::Array(readings), sensor) => {
            let index = sensor.unwrap_or(0);
            readings
                .get(index)
                .cloned()
                .ok_or(ResolveError::SensorOutOfRange { index, len: readings.len() })
        }
        (scalar, None) => Ok(scalar.clone()),
        (_, Some(_)) => Err(ResolveError::MalformedDocument(
            "sensor index given for a scalar field",
        )),
    }
}
