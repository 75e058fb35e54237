//! A stresstest tool that drives synthetic search traffic against the
//! customer/event document search service.
//!
//! Query parameters are sampled from CSV corpora of previously exported
//! records, so the generated load hits realistic, indexed values. Every
//! request records two independent checks (status 200; body contains
//! `"results"`), and the run ends with a throughput and latency report per
//! entity type.
//!
//! Randomness is driven by per-virtual-user [`Workload`] RNGs derived from a
//! single configurable seed, making a run's query sequence reproducible.
#![warn(missing_docs)]

pub mod config;
pub mod health;
pub mod http;
pub mod observability;
pub mod samples;
pub mod stresstest;
pub mod workload;

pub use crate::stresstest::run;
pub use crate::workload::Workload;
