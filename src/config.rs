//! Runtime configuration, loaded from a YAML file.
//!
//! Every field has a default, so a configuration file only needs to name the
//! settings it wants to override:
//!
//! ```yaml
//! remote: http://localhost:8080
//! vus: 50
//! duration: 30s
//! customer_ratio: 0.5
//! think_time: 1s
//! customer_csv: customer_sample.csv
//! event_csv: event_sample.csv
//! seed: 1234
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Runtime configuration for one stresstest run.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the search service under test.
    pub remote: String,

    /// Number of concurrent virtual users.
    pub vus: usize,

    /// Total run duration.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Probability that an iteration targets the customer endpoint.
    pub customer_ratio: f64,

    /// Pause at the end of every iteration, bounding the per-user rate.
    #[serde(with = "humantime_serde")]
    pub think_time: Duration,

    /// Path to the customer sample corpus.
    pub customer_csv: PathBuf,

    /// Path to the event sample corpus.
    pub event_csv: PathBuf,

    /// RNG seed for reproducible query sequences; drawn from entropy when
    /// absent.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: "http://localhost:8080".into(),
            vus: 50,
            duration: Duration::from_secs(30),
            customer_ratio: 0.5,
            think_time: Duration::from_secs(1),
            customer_csv: "customer_sample.csv".into(),
            event_csv: "event_sample.csv".into(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = serde_yaml::from_str("vus: 5\n").unwrap();
        assert_eq!(config.vus, 5);
        assert_eq!(config.remote, "http://localhost:8080");
        assert_eq!(config.duration, Duration::from_secs(30));
        assert_eq!(config.customer_ratio, 0.5);
        assert_eq!(config.think_time, Duration::from_secs(1));
        assert!(config.seed.is_none());
    }

    #[test]
    fn durations_use_humantime() {
        let config: Config = serde_yaml::from_str(
            "duration: 2m\nthink_time: 250ms\nseed: 99\ncustomer_csv: /tmp/c.csv\n",
        )
        .unwrap();
        assert_eq!(config.duration, Duration::from_secs(120));
        assert_eq!(config.think_time, Duration::from_millis(250));
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.customer_csv, PathBuf::from("/tmp/c.csv"));
    }
}
