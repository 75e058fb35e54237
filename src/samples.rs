//! Loading and sampling of the CSV-backed query corpora.
//!
//! A [`SampleTable`] is parsed once during setup and then shared read-only by
//! all virtual users; records are drawn uniformly with replacement for the
//! whole run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::Rng;
use rand::rngs::SmallRng;

/// The corpus variant a table holds, fixing its column layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Customer records, searched via `/search_customers`.
    Customer,
    /// Event records, searched via `/search_events`.
    Event,
}

impl Variant {
    /// Column layout of the CSV, in file order. The first column is always
    /// the record key.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Variant::Customer => &["key", "email", "phone", "visitor_id"],
            Variant::Event => &[
                "key",
                "visitor_id",
                "call_id",
                "chat_id",
                "external_id",
                "form2lead_id",
                "tickets_id",
            ],
        }
    }

    /// Columns that are valid query parameters, which is every column except
    /// the record key.
    pub fn query_fields(self) -> &'static [&'static str] {
        &self.columns()[1..]
    }

    /// Path segment of the search endpoint for this variant.
    pub fn endpoint(self) -> &'static str {
        match self {
            Variant::Customer => "search_customers",
            Variant::Event => "search_events",
        }
    }

    /// Short tag used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Variant::Customer => "customer",
            Variant::Event => "event",
        }
    }
}

/// One row of the corpus, values in column order.
///
/// Rows shorter than the column layout are padded with empty strings, so a
/// record always has one value per column.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    values: Vec<String>,
}

impl SampleRecord {
    fn from_line(line: &str, width: usize) -> Self {
        let mut values: Vec<String> =
            line.split(',').take(width).map(unquote).collect();
        values.resize(width, String::new());
        Self { values }
    }

    /// Values of the query-field columns, i.e. everything after the key.
    fn query_values(&self) -> &[String] {
        &self.values[1..]
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> &[String] {
        &self.values
    }
}

/// An immutable corpus of one variant, loaded from CSV at setup.
#[derive(Debug)]
pub struct SampleTable {
    variant: Variant,
    records: Vec<SampleRecord>,
}

impl SampleTable {
    /// Reads and parses the corpus file. A missing or unreadable file is a
    /// fatal setup error.
    pub fn load(variant: Variant, path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| {
            format!(
                "failed to read {} corpus from `{}`",
                variant.label(),
                path.display()
            )
        })?;
        Ok(Self::parse(variant, &raw))
    }

    /// Parses the raw CSV text: the header line is discarded, blank lines are
    /// skipped, and every remaining line becomes one record.
    pub fn parse(variant: Variant, raw: &str) -> Self {
        let width = variant.columns().len();
        let records = raw
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| SampleRecord::from_line(line, width))
            .collect();
        Self { variant, records }
    }

    /// The variant this table was loaded as.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Uniform random record, with replacement. `None` for an empty table.
    pub fn sample(&self, rng: &mut SmallRng) -> Option<&SampleRecord> {
        if self.records.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.records.len());
        Some(&self.records[idx])
    }
}

/// Picks one query field of `record` whose value is usable, uniformly at
/// random among the usable candidates.
///
/// A value is usable when it is non-blank after trimming and is not the
/// literal string `"null"` in any casing. Returns `None` when the record has
/// no usable query field, in which case the caller skips the request.
pub fn select_field<'a>(
    variant: Variant,
    record: &'a SampleRecord,
    rng: &mut SmallRng,
) -> Option<(&'static str, &'a str)> {
    let usable: Vec<_> = variant
        .query_fields()
        .iter()
        .zip(record.query_values())
        .filter(|(_, value)| is_usable(value))
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    if usable.is_empty() {
        return None;
    }
    Some(usable[rng.random_range(0..usable.len())])
}

fn is_usable(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("null")
}

/// Strips a single leading and a single trailing double quote.
fn unquote(field: &str) -> String {
    let field = field.strip_prefix('"').unwrap_or(field);
    let field = field.strip_suffix('"').unwrap_or(field);
    field.to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Write;

    use rand::SeedableRng;

    use super::*;

    fn rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    #[test]
    fn parse_counts_non_blank_lines() {
        let raw = "key,email,phone,visitor_id\n\
                   1,a@example.com,111,v1\n\
                   \n\
                   2,b@example.com,222,v2\n\
                   \n";
        let table = SampleTable::parse(Variant::Customer, raw);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn parse_strips_surrounding_quotes() {
        let raw = "key,email,phone,visitor_id\n\"1\",\"a@example.com\",\"111\",\"v1\"\n";
        let table = SampleTable::parse(Variant::Customer, raw);
        assert_eq!(
            table.records[0].values(),
            &["1", "a@example.com", "111", "v1"]
        );
    }

    #[test]
    fn parse_pads_short_rows() {
        let raw = "key,visitor_id,call_id,chat_id,external_id,form2lead_id,tickets_id\n\
                   ev1,vis1\n";
        let table = SampleTable::parse(Variant::Event, raw);
        let record = &table.records[0];
        assert_eq!(record.values().len(), Variant::Event.columns().len());
        assert_eq!(record.values()[1], "vis1");
        assert!(record.values()[2..].iter().all(String::is_empty));

        let mut rng = rng(7);
        for _ in 0..50 {
            let (field, value) = select_field(Variant::Event, record, &mut rng).unwrap();
            assert_eq!(field, "visitor_id");
            assert_eq!(value, "vis1");
        }
    }

    #[test]
    fn load_fails_for_missing_file() {
        let err = SampleTable::load(Variant::Customer, Path::new("/no/such/file.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("customer corpus"));
    }

    #[test]
    fn load_reads_tempfile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "key,email,phone,visitor_id\n1,foo@example.com,,abc123\n").unwrap();
        let table = SampleTable::load(Variant::Customer, file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.records[0].values(),
            &["1", "foo@example.com", "", "abc123"]
        );
    }

    #[test]
    fn selector_skips_blank_fields() {
        let raw = "key,email,phone,visitor_id\n1,foo@example.com,,abc123\n";
        let table = SampleTable::parse(Variant::Customer, raw);
        let record = &table.records[0];

        let mut rng = rng(42);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let (field, _) = select_field(Variant::Customer, record, &mut rng).unwrap();
            assert_ne!(field, "phone");
            seen.insert(field);
        }
        // both usable fields get picked eventually
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn selector_rejects_null_and_whitespace() {
        let raw = "key,email,phone,visitor_id\n1,NULL, ,null\n";
        let table = SampleTable::parse(Variant::Customer, raw);
        let mut rng = rng(3);
        assert!(select_field(Variant::Customer, &table.records[0], &mut rng).is_none());
    }

    #[test]
    fn sampling_covers_the_table() {
        let raw = "key,email,phone,visitor_id\n\
                   1,a@example.com,,\n\
                   2,b@example.com,,\n\
                   3,c@example.com,,\n";
        let table = SampleTable::parse(Variant::Customer, raw);
        let mut rng = rng(9);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let record = table.sample(&mut rng).unwrap();
            seen.insert(record.values()[0].clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn empty_table_yields_nothing() {
        let table = SampleTable::parse(Variant::Event, "header only\n");
        assert!(table.is_empty());
        assert!(table.sample(&mut rng(1)).is_none());
    }
}
