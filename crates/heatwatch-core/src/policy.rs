//! WBGT zone policy table.
//!
//! Maps each heat-stress zone to its work/rest durations and, optionally,
//! the WBGT thresholds used for sensor-driven classification. The table is
//! loaded once at startup and immutable thereafter; lookup never consults
//! live sensor data (zone selection is caller-supplied).

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};

/// Closed set of zone identifiers.
///
/// `Cutoff` is the privileged stand-down entry; `Test` is a diagnostic zone
/// with deliberately short durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneId {
    White,
    Green,
    Yellow,
    Red,
    Black,
    Cutoff,
    Test,
}

impl ZoneId {
    pub const ALL: [ZoneId; 7] = [
        ZoneId::White,
        ZoneId::Green,
        ZoneId::Yellow,
        ZoneId::Red,
        ZoneId::Black,
        ZoneId::Cutoff,
        ZoneId::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneId::White => "white",
            ZoneId::Green => "green",
            ZoneId::Yellow => "yellow",
            ZoneId::Red => "red",
            ZoneId::Black => "black",
            ZoneId::Cutoff => "cutoff",
            ZoneId::Test => "test",
        }
    }

    /// Whether a non-authority actor may select this zone directly.
    /// The `cutoff` entry is applied by the cutoff controller, not assigned.
    pub fn is_privileged(self) -> bool {
        matches!(self, ZoneId::Cutoff)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(ZoneId::White),
            "green" => Ok(ZoneId::Green),
            "yellow" => Ok(ZoneId::Yellow),
            "red" => Ok(ZoneId::Red),
            "black" => Ok(ZoneId::Black),
            "cutoff" => Ok(ZoneId::Cutoff),
            "test" => Ok(ZoneId::Test),
            other => Err(EngineError::InvalidZone(other.to_string())),
        }
    }
}

/// One zone's policy: work/rest durations plus optional WBGT bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonePolicy {
    pub id: ZoneId,
    /// Work window length in minutes.
    pub work_min: u64,
    /// Mandated rest length in minutes.
    pub rest_min: u64,
    /// Inclusive lower WBGT bound (degrees C), if threshold-classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wbgt_min: Option<f64>,
    /// Exclusive upper WBGT bound (degrees C), if threshold-classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wbgt_max: Option<f64>,
}

impl ZonePolicy {
    pub fn new(id: ZoneId, work_min: u64, rest_min: u64) -> Self {
        Self {
            id,
            work_min,
            rest_min,
            wbgt_min: None,
            wbgt_max: None,
        }
    }

    pub fn with_thresholds(mut self, wbgt_min: f64, wbgt_max: f64) -> Self {
        self.wbgt_min = Some(wbgt_min);
        self.wbgt_max = Some(wbgt_max);
        self
    }

    pub fn work_duration(&self) -> Duration {
        Duration::minutes(self.work_min as i64)
    }

    pub fn rest_duration(&self) -> Duration {
        Duration::minutes(self.rest_min as i64)
    }

    /// Whether a WBGT reading falls inside this zone's [min, max) band.
    pub fn contains(&self, wbgt: f64) -> bool {
        match (self.wbgt_min, self.wbgt_max) {
            (Some(lo), Some(hi)) => wbgt >= lo && wbgt < hi,
            (Some(lo), None) => wbgt >= lo,
            _ => false,
        }
    }
}

/// Ordered, immutable zone policy table.
///
/// Validated at construction: ids are unique and a `cutoff` entry with
/// `work_min == 0` must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonePolicyTable {
    zones: Vec<ZonePolicy>,
}

impl ZonePolicyTable {
    /// The production deployment's zone table.
    pub fn builtin() -> Self {
        Self {
            zones: vec![
                ZonePolicy::new(ZoneId::White, 60, 15).with_thresholds(0.0, 30.0),
                ZonePolicy::new(ZoneId::Green, 45, 15).with_thresholds(30.0, 31.0),
                ZonePolicy::new(ZoneId::Yellow, 30, 15).with_thresholds(31.0, 32.0),
                ZonePolicy::new(ZoneId::Red, 30, 30).with_thresholds(32.0, 33.0),
                ZonePolicy::new(ZoneId::Black, 15, 30).with_thresholds(33.0, f64::MAX),
                ZonePolicy::new(ZoneId::Cutoff, 0, 30),
                ZonePolicy::new(ZoneId::Test, 1, 1),
            ],
        }
    }

    /// Build a table from an explicit zone list.
    pub fn from_zones(zones: Vec<ZonePolicy>) -> Result<Self, ConfigError> {
        for (i, zone) in zones.iter().enumerate() {
            if zones[..i].iter().any(|z| z.id == zone.id) {
                return Err(ConfigError::InvalidValue {
                    key: "zones".to_string(),
                    message: format!("duplicate zone '{}'", zone.id),
                });
            }
        }
        match zones.iter().find(|z| z.id == ZoneId::Cutoff) {
            None => {
                return Err(ConfigError::InvalidValue {
                    key: "zones".to_string(),
                    message: "table must include a 'cutoff' entry".to_string(),
                })
            }
            Some(cutoff) if cutoff.work_min != 0 => {
                return Err(ConfigError::InvalidValue {
                    key: "zones".to_string(),
                    message: "'cutoff' entry must have work_min = 0".to_string(),
                })
            }
            Some(_) => {}
        }
        Ok(Self { zones })
    }

    pub fn get(&self, id: ZoneId) -> Option<&ZonePolicy> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Lookup that maps a missing entry to [`EngineError::InvalidZone`].
    pub fn require(&self, id: ZoneId) -> Result<&ZonePolicy, EngineError> {
        self.get(id)
            .ok_or_else(|| EngineError::InvalidZone(id.to_string()))
    }

    /// All zones in table order.
    pub fn zones(&self) -> &[ZonePolicy] {
        &self.zones
    }

    /// Classify a WBGT reading into the first matching threshold band.
    ///
    /// Unused by the inbound operations (zone selection is caller-supplied);
    /// kept for sensor-driven deployments.
    pub fn classify(&self, wbgt: f64) -> Option<ZoneId> {
        self.zones.iter().find(|z| z.contains(wbgt)).map(|z| z.id)
    }
}

impl Default for ZonePolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_all_zones() {
        let table = ZonePolicyTable::builtin();
        for id in ZoneId::ALL {
            assert!(table.get(id).is_some(), "missing zone {id}");
        }
    }

    #[test]
    fn builtin_cutoff_has_zero_work() {
        let table = ZonePolicyTable::builtin();
        assert_eq!(table.get(ZoneId::Cutoff).unwrap().work_min, 0);
    }

    #[test]
    fn from_zones_rejects_missing_cutoff() {
        let zones = vec![ZonePolicy::new(ZoneId::Yellow, 30, 15)];
        assert!(ZonePolicyTable::from_zones(zones).is_err());
    }

    #[test]
    fn from_zones_rejects_nonzero_cutoff_work() {
        let zones = vec![
            ZonePolicy::new(ZoneId::Yellow, 30, 15),
            ZonePolicy::new(ZoneId::Cutoff, 5, 30),
        ];
        assert!(ZonePolicyTable::from_zones(zones).is_err());
    }

    #[test]
    fn from_zones_rejects_duplicates() {
        let zones = vec![
            ZonePolicy::new(ZoneId::Yellow, 30, 15),
            ZonePolicy::new(ZoneId::Yellow, 20, 15),
            ZonePolicy::new(ZoneId::Cutoff, 0, 30),
        ];
        assert!(ZonePolicyTable::from_zones(zones).is_err());
    }

    #[test]
    fn classify_picks_band() {
        let table = ZonePolicyTable::builtin();
        assert_eq!(table.classify(29.0), Some(ZoneId::White));
        assert_eq!(table.classify(31.5), Some(ZoneId::Yellow));
        assert_eq!(table.classify(40.0), Some(ZoneId::Black));
    }

    #[test]
    fn zone_id_round_trips_from_str() {
        assert_eq!("yellow".parse::<ZoneId>().unwrap(), ZoneId::Yellow);
        assert_eq!("BLACK".parse::<ZoneId>().unwrap(), ZoneId::Black);
        assert!("magenta".parse::<ZoneId>().is_err());
    }
}
