//! One virtual user's view of the search workload.
//!
//! Each virtual user owns a [`Workload`]: shared handles to both corpora, the
//! configured entity-type split, and a seeded RNG driving every random draw.
//! With a fixed seed the full sequence of sampled queries is reproducible.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reqwest::StatusCode;

use crate::samples::{self, SampleTable, Variant};

/// One sampled search query, rebuilt fresh every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The entity type this query targets.
    pub variant: Variant,
    /// The chosen query field.
    pub field: &'static str,
    /// The sampled value, still unencoded.
    pub value: String,
}

/// Per-virtual-user sampling state.
#[derive(Debug)]
pub struct Workload {
    customers: Arc<SampleTable>,
    events: Arc<SampleTable>,
    customer_ratio: f64,
    rng: SmallRng,
}

impl Workload {
    /// Creates the sampling state for one virtual user.
    pub fn new(
        customers: Arc<SampleTable>,
        events: Arc<SampleTable>,
        customer_ratio: f64,
        seed: u64,
    ) -> Self {
        Self {
            customers,
            events,
            customer_ratio,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Chooses the entity type for one iteration.
    ///
    /// A uniform draw below the configured ratio targets customers when that
    /// corpus has records; otherwise the iteration falls through to events,
    /// and to no request at all when both corpora are empty.
    fn next_variant(&mut self) -> Option<Variant> {
        if self.rng.random::<f64>() < self.customer_ratio && !self.customers.is_empty() {
            Some(Variant::Customer)
        } else if !self.events.is_empty() {
            Some(Variant::Event)
        } else {
            None
        }
    }

    /// Samples the query for one iteration.
    ///
    /// `None` means the iteration skips its request: either no corpus has
    /// records, or the sampled record held no usable field.
    pub fn next_query(&mut self) -> Option<Query> {
        let variant = self.next_variant()?;
        let table = match variant {
            Variant::Customer => Arc::clone(&self.customers),
            Variant::Event => Arc::clone(&self.events),
        };
        let record = table.sample(&mut self.rng)?;
        let (field, value) = samples::select_field(variant, record, &mut self.rng)?;
        Some(Query {
            variant,
            field,
            value: value.to_owned(),
        })
    }
}

/// The two independent assertions recorded for every request.
///
/// Both are always evaluated; a failed status check does not short-circuit
/// the body check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The status code was 200.
    pub status_ok: bool,
    /// The body was non-empty and contained the substring `"results"`.
    pub has_results: bool,
}

impl CheckOutcome {
    /// Evaluates both assertions against a captured response.
    pub fn evaluate(status: StatusCode, body: &str) -> Self {
        Self {
            status_ok: status == StatusCode::OK,
            has_results: !body.is_empty() && body.contains("results"),
        }
    }

    /// Outcome for a request that never produced a response, such as a
    /// network failure. Both assertions count as failed.
    pub fn failed() -> Self {
        Self {
            status_ok: false,
            has_results: false,
        }
    }
}
