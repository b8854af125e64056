//! Streaming bpftrace log parsing (`*.log`, `*.log.gz`)
//!
//! Two line shapes are recognized anywhere in a line:
//!
//! ```text
//! @total_exits: 16764          -> metric "total_exits" = 16764
//! @latency[2]: 31              -> bucket "2" of histogram "latency"
//! ```
//!
//! Histogram buckets accumulate while consecutive histogram lines share a
//! name. A histogram line for a different name flushes the open map as one
//! `<name>_hist` metric; whatever is still open at end of stream is flushed
//! last.
//!
//! A log that yields any metric also marks the run with the fact
//! `instrumented = true`.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::num::ParseIntError;
use std::sync::LazyLock;

use flate2::read::GzDecoder;
use regex::Regex;

use super::{Enricher, Extraction};
use crate::model::{Artifact, Fact, FactValue, Metric};
use crate::{Error, Result};

static COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9_]+):\s*(-?\d+)").expect("valid regex"));
static HISTOGRAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([a-zA-Z0-9_]+)\[(\d+)\]:\s*(-?\d+)").expect("valid regex")
});

/// Fact set on runs that carry trace output.
pub const INSTRUMENTED_FACT: &str = "instrumented";

/// Suffix of plain trace logs.
pub const LOG_SUFFIX: &str = ".log";
/// Suffix of gzip-compressed trace logs.
pub const LOG_GZ_SUFFIX: &str = ".log.gz";

/// Extracts counter and histogram metrics from bpftrace output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLogEnricher;

impl Enricher for TraceLogEnricher {
    fn name(&self) -> &'static str {
        "trace_log"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        let Some(name) = artifact.file_name() else {
            return Ok(Extraction::default());
        };

        if name.ends_with(LOG_GZ_SUFFIX) {
            let reader = std::io::BufReader::new(GzDecoder::new(artifact.open()?));
            parse_stream(reader, artifact)
        } else if name.ends_with(LOG_SUFFIX) {
            parse_stream(artifact.open()?, artifact)
        } else {
            Ok(Extraction::default())
        }
    }
}

fn parse_stream(reader: impl BufRead, artifact: &Artifact) -> Result<Extraction> {
    let mut parser = TraceParser::new();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|e| Error::extraction(artifact.path(), format!("read failed: {e}")))?;
        let line = String::from_utf8_lossy(&line);
        parser.feed_line(&line).map_err(|e| {
            Error::extraction(artifact.path(), format!("line {}: {e}", index + 1))
        })?;
    }

    let mut extraction = Extraction::from_metrics(parser.finish());
    if extraction.metrics.is_empty() {
        tracing::warn!(path = %artifact.path().display(), "no metrics found in trace log");
        extraction.warnings.push(format!(
            "no metrics found in trace log {}",
            artifact.path().display()
        ));
    } else {
        extraction.facts.push(Fact::new(INSTRUMENTED_FACT, true));
    }
    Ok(extraction)
}

/// Line-at-a-time parser holding the currently open histogram.
#[derive(Debug, Default)]
pub struct TraceParser {
    metrics: Vec<Metric>,
    open: Option<(String, BTreeMap<String, FactValue>)>,
}

impl TraceParser {
    /// Create a parser with no open histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line.
    ///
    /// # Errors
    ///
    /// Returns an error if a matched value does not fit in an `i64`.
    pub fn feed_line(&mut self, line: &str) -> std::result::Result<(), ParseIntError> {
        if let Some(caps) = COUNTER.captures(line) {
            let value: i64 = caps[2].parse()?;
            self.metrics.push(Metric::new(&caps[1], value));
            return Ok(());
        }

        if let Some(caps) = HISTOGRAM.captures(line) {
            let value: i64 = caps[3].parse()?;
            let name = &caps[1];
            if self.open.as_ref().is_some_and(|(open, _)| open != name) {
                self.flush();
            }
            let (_, buckets) = self
                .open
                .get_or_insert_with(|| (name.to_string(), BTreeMap::new()));
            buckets.insert(caps[2].to_string(), FactValue::Int(value));
        }

        Ok(())
    }

    /// Flush any open histogram and return all metrics in emission order.
    #[must_use]
    pub fn finish(mut self) -> Vec<Metric> {
        self.flush();
        self.metrics
    }

    fn flush(&mut self) {
        if let Some((name, buckets)) = self.open.take() {
            self.metrics
                .push(Metric::new(format!("{name}_hist"), FactValue::Map(buckets)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> Vec<Metric> {
        let mut parser = TraceParser::new();
        for line in lines {
            parser.feed_line(line).unwrap();
        }
        parser.finish()
    }

    #[test]
    fn test_counter_line() {
        let metrics = parse(&["Attaching 3 probes...", "@total_exits: 16764"]);
        assert_eq!(metrics, vec![Metric::new("total_exits", 16764_i64)]);
    }

    #[test]
    fn test_histograms_flush_on_name_change() {
        let metrics = parse(&["@a[0]: 1", "@a[1]: 2", "@b[0]: 3"]);

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name(), "a_hist");
        let a = metrics[0].value().as_map().unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a["1"], FactValue::Int(2));
        assert_eq!(metrics[1].name(), "b_hist");
        assert_eq!(metrics[1].value().as_map().unwrap().len(), 1);
    }

    #[test]
    fn test_counter_does_not_interrupt_histogram() {
        let metrics = parse(&["@a[0]: 1", "@count: 9", "@a[1]: 2"]);
        let names: Vec<_> = metrics.iter().map(Metric::name).collect();
        assert_eq!(names, vec!["count", "a_hist"]);
        assert_eq!(metrics[1].value().as_map().unwrap().len(), 2);
    }

    #[test]
    fn test_reopened_histogram_is_a_new_metric() {
        let metrics = parse(&["@a[0]: 1", "@b[0]: 2", "@a[0]: 3"]);
        let names: Vec<_> = metrics.iter().map(Metric::name).collect();
        assert_eq!(names, vec!["a_hist", "b_hist", "a_hist"]);
    }

    #[test]
    fn test_overflow_is_error() {
        let mut parser = TraceParser::new();
        assert!(parser.feed_line("@x: 99999999999999999999999").is_err());
    }
}
