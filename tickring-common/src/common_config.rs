use std::collections::HashMap;

use anyhow::Context;
use log::info;
use once_cell::sync::Lazy;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::chunk_accessor::USE_RANGES_AVERAGE_RUN_LENGTH;
use crate::error::{Result, RingError};
use crate::kind::RingKind;

pub const DEFAULT_CAPACITY: usize = 32_768;

#[derive(Debug, Clone, PartialEq)]
pub struct RingConfig {
    pub default_capacity: usize,
    pub use_ranges_average_run_length: f64,
    pub min_free_memory_ratio: f32,
    pub max_ring_bytes: u64,
}

pub static CONFIG: Lazy<RingConfig> = Lazy::new(ring_config);

impl RingConfig {
    /// Both generations of a `capacity`-slot ring of `kind` must fit the budget.
    pub fn check_budget(&self, kind: RingKind, capacity: usize) -> Result<()> {
        let required = (capacity as u64)
            .saturating_mul(kind.element_width() as u64)
            .saturating_mul(2);
        if required > self.max_ring_bytes {
            return Err(RingError::CapacityExceedsBudget {
                kind,
                capacity,
                required,
                budget: self.max_ring_bytes,
            });
        }
        Ok(())
    }

    pub fn to_metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("default_capacity".into(), self.default_capacity.to_string());
        metadata.insert(
            "use_ranges_average_run_length".into(),
            self.use_ranges_average_run_length.to_string(),
        );
        metadata.insert("min_free_memory_ratio".into(), self.min_free_memory_ratio.to_string());
        metadata.insert("max_ring_bytes".into(), self.max_ring_bytes.to_string());
        metadata
    }

    pub fn from_metadata(metadata: &HashMap<String, String>) -> anyhow::Result<RingConfig> {
        Ok(RingConfig {
            default_capacity: metadata_value(metadata, "default_capacity")?,
            use_ranges_average_run_length: metadata_value(metadata, "use_ranges_average_run_length")?,
            min_free_memory_ratio: metadata_value(metadata, "min_free_memory_ratio")?,
            max_ring_bytes: metadata_value(metadata, "max_ring_bytes")?,
        })
    }
}

fn metadata_value<V>(metadata: &HashMap<String, String>, key: &str) -> anyhow::Result<V>
where
    V: std::str::FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    metadata
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' in metadata", key))?
        .parse()
        .with_context(|| format!("Invalid '{}' in metadata", key))
}

fn env_override<V: std::str::FromStr>(name: &str, default: V) -> V {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("[ring_config] ignoring unparsable {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn ring_config() -> RingConfig {
    let refresh = RefreshKind::everything().with_memory(MemoryRefreshKind::everything());
    let mut sys = System::new_with_specifics(refresh);
    sys.refresh_memory();

    let total_memory = sys.total_memory();
    let min_free_memory_ratio = 0.25;
    // sysinfo reports 0 where memory cannot be read; treat that as unbounded
    let max_ring_bytes = if total_memory == 0 {
        u64::MAX
    } else {
        ((total_memory as f64) * (1.0 - min_free_memory_ratio as f64)) as u64
    };
    let default_capacity = env_override("TICKRING_DEFAULT_CAPACITY", DEFAULT_CAPACITY).max(1);
    let use_ranges_average_run_length =
        env_override("TICKRING_USE_RANGES_RUN_LENGTH", USE_RANGES_AVERAGE_RUN_LENGTH);

    info!("[ring_config] detected {} MiB memory", total_memory / (1024 * 1024));
    info!("[ring_config] max_ring_bytes: {}", max_ring_bytes);
    info!("[ring_config] default_capacity: {}", default_capacity);
    info!(
        "[ring_config] use_ranges_average_run_length: {}",
        use_ranges_average_run_length
    );

    RingConfig {
        default_capacity,
        use_ranges_average_run_length,
        min_free_memory_ratio,
        max_ring_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_counts_both_generations() {
        let mut config = CONFIG.clone();
        config.max_ring_bytes = 64;
        assert!(config.check_budget(RingKind::Long, 4).is_ok());
        let err = config.check_budget(RingKind::Long, 5).unwrap_err();
        assert_eq!(
            err,
            RingError::CapacityExceedsBudget {
                kind: RingKind::Long,
                capacity: 5,
                required: 80,
                budget: 64
            }
        );
    }

    #[test]
    fn metadata_round_trip_keeps_every_field() {
        let mut config = CONFIG.clone();
        config.use_ranges_average_run_length = 7.5;
        config.default_capacity = 12;
        let restored = RingConfig::from_metadata(&config.to_metadata()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn missing_metadata_key_is_reported() {
        let mut metadata = CONFIG.to_metadata();
        metadata.remove("max_ring_bytes");
        let err = RingConfig::from_metadata(&metadata).unwrap_err();
        assert!(err.to_string().contains("max_ring_bytes"), "{err}");
    }
}
