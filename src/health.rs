//! One-shot diagnostic probe of the service's `/healthz` endpoint.
//!
//! The probe runs once before any load is generated and only ever logs; no
//! outcome here can fail or delay the run.

use bytesize::ByteSize;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use crate::http::SearchRemote;

/// Diagnostic counters reported by the search service.
#[derive(Debug, Deserialize)]
pub struct HealthReport {
    /// Number of customer documents currently indexed.
    pub customer_count: u64,
    /// Number of event documents currently indexed.
    pub event_count: u64,
    /// Server-side memory usage, when the service reports it.
    #[serde(default)]
    pub redis_memory: Option<MemoryUsage>,
}

/// Server memory usage block of the health response.
///
/// The service may report an empty object here when it could not read its
/// own memory stats, so both fields are optional.
#[derive(Debug, Deserialize)]
pub struct MemoryUsage {
    /// Used memory in bytes.
    #[serde(default)]
    pub used_memory_bytes: Option<u64>,
    /// Human-readable form of the used memory, as reported by the server.
    #[serde(default)]
    pub used_memory_human: Option<String>,
}

/// Probes `/healthz` once and logs the server's baseline state.
pub async fn probe(remote: &SearchRemote) {
    let response = match remote.healthz().await {
        Ok(response) => response,
        Err(err) => {
            warn!("health probe request failed: {err}");
            return;
        }
    };

    if response.status != StatusCode::OK {
        warn!(
            status = %response.status,
            body = %response.body,
            "health probe returned an error status"
        );
        return;
    }

    match serde_json::from_str::<HealthReport>(&response.body) {
        Ok(report) => log_report(&report),
        Err(err) => warn!(
            body = %response.body,
            "failed to parse health probe body: {err}"
        ),
    }
}

fn log_report(report: &HealthReport) {
    info!(
        customers = report.customer_count,
        events = report.event_count,
        "server baseline"
    );
    if let Some(bytes) = report.redis_memory.as_ref().and_then(|m| m.used_memory_bytes) {
        let human = report
            .redis_memory
            .as_ref()
            .and_then(|m| m.used_memory_human.as_deref())
            .unwrap_or("n/a");
        info!("server memory: {} ({human})", ByteSize::b(bytes));
    }
}
