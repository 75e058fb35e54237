//! Runs the virtual users against the search service and prints the report.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sketches_ddsketch::DDSketch;
use tracing::{info, warn};
use yansi::Paint;

use crate::config::Config;
use crate::http::SearchRemote;
use crate::samples::{SampleTable, Variant};
use crate::workload::{CheckOutcome, Workload};

/// Runs `config.vus` virtual users for `config.duration` and prints the
/// aggregated throughput and latency report.
pub async fn run(
    remote: SearchRemote,
    customers: Arc<SampleTable>,
    events: Arc<SampleTable>,
    config: &Config,
) -> Result<()> {
    let remote = Arc::new(remote);
    let metrics = Arc::new(Mutex::new(RunMetrics::default()));
    let base_seed = config.seed.unwrap_or_else(rand::random);
    info!(seed = base_seed, vus = config.vus, "starting workload");

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message("Running stresstest:");
    bar.enable_steady_tick(Duration::from_millis(100));

    let deadline = tokio::time::Instant::now() + config.duration;
    let tasks: Vec<_> = (0..config.vus)
        .map(|vu| {
            let remote = Arc::clone(&remote);
            let metrics = Arc::clone(&metrics);
            let mut workload = Workload::new(
                Arc::clone(&customers),
                Arc::clone(&events),
                config.customer_ratio,
                base_seed.wrapping_add(vu as u64),
            );
            let think_time = config.think_time;

            tokio::spawn(async move {
                loop {
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    run_iteration(&remote, &mut workload, &metrics).await;

                    // think-time, cut short by the deadline
                    let pause = tokio::time::sleep(think_time);
                    if tokio::time::timeout_at(deadline, pause).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.context("virtual user task panicked")?;
    }
    bar.finish_and_clear();

    let metrics = Arc::try_unwrap(metrics)
        .map_err(|_| ())
        .expect("all virtual users joined")
        .into_inner()
        .expect("metrics mutex poisoned");
    print_report(&metrics, config.duration, config.vus);
    Ok(())
}

/// One virtual-user iteration: sample a query, issue it, record both checks.
async fn run_iteration(
    remote: &SearchRemote,
    workload: &mut Workload,
    metrics: &Mutex<RunMetrics>,
) {
    let Some(query) = workload.next_query() else {
        metrics.lock().unwrap().skipped += 1;
        return;
    };

    let url = remote.search_url(query.variant, query.field, &query.value);
    let start = Instant::now();
    match remote.search(url.clone()).await {
        Ok(response) => {
            let outcome = CheckOutcome::evaluate(response.status, &response.body);
            if !outcome.status_ok {
                let body: String = response.body.chars().take(200).collect();
                warn!(
                    entity = query.variant.label(),
                    status = %response.status,
                    url = %url,
                    body = %body,
                    "search request failed"
                );
            }
            metrics
                .lock()
                .unwrap()
                .record(query.variant, outcome, start.elapsed());
        }
        Err(err) => {
            warn!(
                entity = query.variant.label(),
                url = %url,
                "search request error: {err}"
            );
            metrics
                .lock()
                .unwrap()
                .record(query.variant, CheckOutcome::failed(), start.elapsed());
        }
    }
}

/// Aggregated counters and timings for one entity type.
#[derive(Default)]
struct EntityMetrics {
    requests: u64,
    status_failures: u64,
    results_failures: u64,
    timing: DDSketch,
}

impl EntityMetrics {
    fn merge(&mut self, other: &EntityMetrics) {
        self.requests += other.requests;
        self.status_failures += other.status_failures;
        self.results_failures += other.results_failures;
        self.timing.merge(&other.timing).unwrap();
    }
}

/// Aggregated counters for the whole run, shared by all virtual users.
#[derive(Default)]
pub(crate) struct RunMetrics {
    customers: EntityMetrics,
    events: EntityMetrics,
    skipped: u64,
}

impl RunMetrics {
    fn record(&mut self, variant: Variant, outcome: CheckOutcome, elapsed: Duration) {
        let entity = match variant {
            Variant::Customer => &mut self.customers,
            Variant::Event => &mut self.events,
        };
        entity.requests += 1;
        if !outcome.status_ok {
            entity.status_failures += 1;
        }
        if !outcome.has_results {
            entity.results_failures += 1;
        }
        entity.timing.add(elapsed.as_secs_f64());
    }
}

fn print_report(metrics: &RunMetrics, duration: Duration, vus: usize) {
    println!();
    println!(
        "{} (duration: {:?}, vus: {})",
        "## Search stresstest".bold(),
        duration,
        vus.bold()
    );

    print_entity("CUSTOMER SEARCH", &metrics.customers, duration);
    print_entity("EVENT SEARCH", &metrics.events, duration);

    let mut total = EntityMetrics::default();
    total.merge(&metrics.customers);
    total.merge(&metrics.events);
    print_entity("TOTAL", &total, duration);

    if metrics.skipped > 0 {
        println!(
            "{} iterations skipped (empty corpus or no usable field)",
            metrics.skipped.bold().yellow()
        );
    }
}

fn print_entity(label: &str, entity: &EntityMetrics, duration: Duration) {
    if entity.requests == 0 {
        return;
    }
    println!();
    print!(
        "{} ({} requests",
        label.bold().green(),
        entity.requests.bold()
    );
    if entity.status_failures > 0 {
        print!(
            ", {}",
            format!("{} non-200", entity.status_failures).bold().red()
        );
    }
    if entity.results_failures > 0 {
        print!(
            ", {}",
            format!("{} missing \"results\"", entity.results_failures)
                .bold()
                .red()
        );
    }
    println!(")");

    let rate = entity.requests as f64 / duration.as_secs_f64();
    println!("  {:.2} requests/s", rate.bold());
    print_percentiles(&entity.timing);
}

fn print_percentiles(sketch: &DDSketch) {
    let ops = sketch.count();
    let avg = Duration::from_secs_f64(sketch.sum().unwrap() / ops as f64);
    let p50 = Duration::from_secs_f64(sketch.quantile(0.5).unwrap().unwrap());
    let p90 = Duration::from_secs_f64(sketch.quantile(0.9).unwrap().unwrap());
    let p99 = Duration::from_secs_f64(sketch.quantile(0.99).unwrap().unwrap());
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn record_counts_each_assertion_separately() {
        let mut metrics = RunMetrics::default();
        let elapsed = Duration::from_millis(10);

        let ok = CheckOutcome::evaluate(StatusCode::OK, r#"{"results":[]}"#);
        metrics.record(Variant::Customer, ok, elapsed);

        let not_found = CheckOutcome::evaluate(StatusCode::NOT_FOUND, "gone");
        metrics.record(Variant::Customer, not_found, elapsed);

        let empty_body = CheckOutcome::evaluate(StatusCode::OK, "");
        metrics.record(Variant::Event, empty_body, elapsed);

        assert_eq!(metrics.customers.requests, 2);
        assert_eq!(metrics.customers.status_failures, 1);
        assert_eq!(metrics.customers.results_failures, 1);
        assert_eq!(metrics.events.requests, 1);
        assert_eq!(metrics.events.status_failures, 0);
        assert_eq!(metrics.events.results_failures, 1);
        assert_eq!(metrics.customers.timing.count(), 2);
    }

    #[test]
    fn merge_combines_entities() {
        let mut metrics = RunMetrics::default();
        let elapsed = Duration::from_millis(5);
        metrics.record(Variant::Customer, CheckOutcome::failed(), elapsed);
        metrics.record(Variant::Event, CheckOutcome::failed(), elapsed);

        let mut total = EntityMetrics::default();
        total.merge(&metrics.customers);
        total.merge(&metrics.events);
        assert_eq!(total.requests, 2);
        assert_eq!(total.status_failures, 2);
        assert_eq!(total.timing.count(), 2);
    }
}
