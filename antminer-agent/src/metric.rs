//! Monitoring item registry
//!
//! Item paths such as `STATS.chain.0.temp_chip.2` are parsed once into a
//! [`Metric`]. Unknown roots, unknown chain metrics and non-numeric indices
//! are rejected here, before the status document is even fetched.
//!
//! Two path conventions exist in deployed Zabbix templates:
//! - [`Dialect::Basic`]: STATS-only items, the six original chain metrics,
//!   temperature arrays collapsed to their first sensor.
//! - [`Dialect::Extended`]: adds `STATUS`, `INFO`, chain metric aliases,
//!   `asic_num`, explicit sensor indices and `-`/`_` aliasing of flat keys.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::ResolveError;

/// Item path convention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Dialect {
    Basic,
    #[default]
    Extended,
}

/// Per-chain field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainField {
    FreqAvg,
    RateReal,
    Hw,
    AsicNum,
    TempChip,
    TempPcb,
    TempPic,
}

impl ChainField {
    /// Field name in the miner's JSON
    pub fn json_key(self) -> &'static str {
        match self {
            ChainField::FreqAvg => "freq_avg",
            ChainField::RateReal => "rate_real",
            ChainField::Hw => "hw",
            ChainField::AsicNum => "asic_num",
            ChainField::TempChip => "temp_chip",
            ChainField::TempPcb => "temp_pcb",
            ChainField::TempPic => "temp_pic",
        }
    }

    pub fn is_temperature(self) -> bool {
        matches!(
            self,
            ChainField::TempChip | ChainField::TempPcb | ChainField::TempPic
        )
    }

    fn parse(name: &str, dialect: Dialect) -> Result<Self, ResolveError> {
        let field = match (name, dialect) {
            ("freq_avg", _) => ChainField::FreqAvg,
            ("rate_real", _) => ChainField::RateReal,
            ("hw", _) => ChainField::Hw,
            ("temp_chip", _) => ChainField::TempChip,
            ("temp_pcb", _) => ChainField::TempPcb,
            ("temp_pic", _) => ChainField::TempPic,
            ("rate", Dialect::Extended) => ChainField::RateReal,
            ("hw_errors", Dialect::Extended) => ChainField::Hw,
            ("asic_num", Dialect::Extended) => ChainField::AsicNum,
            _ => return Err(ResolveError::UnknownChainMetric(name.to_string())),
        };
        Ok(field)
    }
}

/// A resolvable monitoring item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metric {
    /// `STATUS.STATUS`
    Status,
    /// `INFO.<key>`
    Info(String),
    /// Flat `STATS[0]` field. `aliased` enables the `-`/`_` fallback.
    Stat { key: String, aliased: bool },
    /// `STATS.fan.<index>`
    Fan(usize),
    /// `STATS.chain.<index>.<field>[.<sensor>]`
    Chain {
        index: usize,
        field: ChainField,
        sensor: Option<usize>,
    },
}

impl Metric {
    /// Parses an item path under the given dialect
    pub fn parse(path: &str, dialect: Dialect) -> Result<Self, ResolveError> {
        let segments: Vec<&str> = path.split('.').collect();
        let segment = |position: usize| {
            segments
                .get(position)
                .copied()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ResolveError::MissingSegment {
                    path: path.to_string(),
                    position,
                })
        };

        let root = segments.first().copied().unwrap_or_default();
        if root.is_empty() {
            return Err(ResolveError::EmptyPath);
        }

        // (metric, number of segments it consumed)
        let (metric, used) = match (root, dialect) {
            ("STATUS", Dialect::Extended) => (Metric::Status, 2),
            ("INFO", Dialect::Extended) => (Metric::Info(segment(1)?.to_string()), 2),
            ("STATS", _) => {
                let name = segment(1)?;
                match name {
                    "chain" => {
                        let index = parse_index(segment(2)?)?;
                        let field = ChainField::parse(segment(3)?, dialect)?;
                        let sensor = match (dialect, segments.get(4)) {
                            (Dialect::Extended, Some(s)) if field.is_temperature() => {
                                Some(parse_index(s)?)
                            }
                            _ => None,
                        };
                        let used = if sensor.is_some() { 5 } else { 4 };
                        (Metric::Chain { index, field, sensor }, used)
                    }
                    "fan" => (Metric::Fan(parse_index(segment(2)?)?), 3),
                    _ => (
                        Metric::Stat {
                            key: name.to_string(),
                            aliased: dialect == Dialect::Extended,
                        },
                        2,
                    ),
                }
            }
            _ => return Err(ResolveError::UnknownRoot(root.to_string())),
        };

        if segments.len() > used {
            return Err(ResolveError::TrailingSegments(path.to_string()));
        }
        Ok(metric)
    }
}

impl FromStr for Metric {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::parse(s, Dialect::default())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Status => write!(f, "STATUS.STATUS"),
            Metric::Info(key) => write!(f, "INFO.{key}"),
            Metric::Stat { key, .. } => write!(f, "STATS.{key}"),
            Metric::Fan(index) => write!(f, "STATS.fan.{index}"),
            Metric::Chain { index, field, sensor } => {
                write!(f, "STATS.chain.{index}.{}", field.json_key())?;
                if let Some(sensor) = sensor {
                    write!(f, ".{sensor}")?;
                }
                Ok(())
            }
        }
    }
}

fn parse_index(segment: &str) -> Result<usize, ResolveError> {
    segment
        .parse()
        .map_err(|_| ResolveError::InvalidIndex(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_items() {
        assert_eq!(
            "STATS.chain.0.temp_chip.2".parse::<Metric>().unwrap(),
            Metric::Chain { index: 0, field: ChainField::TempChip, sensor: Some(2) }
        );
        assert_eq!(
            "STATS.chain.1.rate".parse::<Metric>().unwrap(),
            Metric::Chain { index: 1, field: ChainField::RateReal, sensor: None }
        );
        assert_eq!(
            "STATS.chain.2.hw_errors".parse::<Metric>().unwrap(),
            Metric::Chain { index: 2, field: ChainField::Hw, sensor: None }
        );
    }

    #[test]
    fn test_parse_roots() {
        assert_eq!("STATUS.STATUS".parse::<Metric>().unwrap(), Metric::Status);
        assert_eq!("STATUS".parse::<Metric>().unwrap(), Metric::Status);
        assert_eq!("INFO.type".parse::<Metric>().unwrap(), Metric::Info("type".into()));
        assert_eq!("STATS.fan.1".parse::<Metric>().unwrap(), Metric::Fan(1));
        assert_eq!(
            "STATS.miner-mode".parse::<Metric>().unwrap(),
            Metric::Stat { key: "miner-mode".into(), aliased: true }
        );
    }

    #[test]
    fn test_rejects_malformed_paths() {
        assert_eq!("".parse::<Metric>(), Err(ResolveError::EmptyPath));
        assert_eq!(
            "POOLS.0".parse::<Metric>(),
            Err(ResolveError::UnknownRoot("POOLS".into()))
        );
        assert!(matches!(
            "INFO".parse::<Metric>(),
            Err(ResolveError::MissingSegment { position: 1, .. })
        ));
        assert!(matches!(
            "STATS.chain.0".parse::<Metric>(),
            Err(ResolveError::MissingSegment { position: 3, .. })
        ));
        assert_eq!(
            "STATS.fan.x".parse::<Metric>(),
            Err(ResolveError::InvalidIndex("x".into()))
        );
        assert_eq!(
            "STATS.chain.-1.hw".parse::<Metric>(),
            Err(ResolveError::InvalidIndex("-1".into()))
        );
        assert_eq!(
            "STATS.chain.0.voltage".parse::<Metric>(),
            Err(ResolveError::UnknownChainMetric("voltage".into()))
        );
    }

    #[test]
    fn test_rejects_trailing_segments() {
        for path in [
            "STATS.chain.0.freq_avg.9",
            "STATS.chain.0.temp_chip.1.2",
            "STATS.rate_5s.x",
            "STATS.fan.0.rpm",
            "INFO.type.name",
            "STATUS.STATUS.Msg",
        ] {
            assert_eq!(
                path.parse::<Metric>(),
                Err(ResolveError::TrailingSegments(path.into())),
                "{path}"
            );
        }
    }

    #[test]
    fn test_basic_dialect_is_strict() {
        assert_eq!(
            Metric::parse("INFO.type", Dialect::Basic),
            Err(ResolveError::UnknownRoot("INFO".into()))
        );
        assert_eq!(
            Metric::parse("STATS.chain.0.asic_num", Dialect::Basic),
            Err(ResolveError::UnknownChainMetric("asic_num".into()))
        );
        assert_eq!(
            Metric::parse("STATS.chain.0.temp_pcb", Dialect::Basic).unwrap(),
            Metric::Chain { index: 0, field: ChainField::TempPcb, sensor: None }
        );
        // No sensor indices in the basic dialect
        assert_eq!(
            Metric::parse("STATS.chain.0.temp_pcb.3", Dialect::Basic),
            Err(ResolveError::TrailingSegments("STATS.chain.0.temp_pcb.3".into()))
        );
        assert_eq!(
            Metric::parse("STATS.miner_mode", Dialect::Basic).unwrap(),
            Metric::Stat { key: "miner_mode".into(), aliased: false }
        );
    }

    #[test]
    fn test_display_is_canonical() {
        let metric: Metric = "STATS.chain.3.rate".parse().unwrap();
        assert_eq!(metric.to_string(), "STATS.chain.3.rate_real");
        let metric: Metric = "STATS.chain.0.temp_pic.1".parse().unwrap();
        assert_eq!(metric.to_string(), "STATS.chain.0.temp_pic.1");
    }
}
