//! Year-keyed accumulation of parsed invoices.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::{InvoiceHeader, InvoiceLine, YearBucket, format_year_distribution};

/// Owns every year bucket of a run.
///
/// All mutation goes through [`record`](Self::record), which takes the
/// internal lock, so the aggregator can be shared between threads. Rows
/// recorded by one caller keep their relative order; rows from concurrent
/// callers may interleave.
#[derive(Debug, Default)]
pub struct YearAggregator {
    buckets: Mutex<BTreeMap<i32, YearBucket>>,
}

impl YearAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<i32, YearBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an invoice and its lines to the bucket of its issue year and
    /// return that year. Duplicate invoice numbers are kept.
    pub fn record(&self, header: InvoiceHeader, lines: Vec<InvoiceLine>) -> i32 {
        let year = header.year();
        let mut buckets = self.lock();
        let bucket = buckets.entry(year).or_insert_with(|| YearBucket::new(year));
        bucket.headers.push(header);
        bucket.lines.extend(lines);
        year
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of invoices recorded across all years.
    pub fn invoice_count(&self) -> usize {
        self.lock().values().map(|b| b.headers.len()).sum()
    }

    /// Invoice count per year, ascending.
    pub fn year_counts(&self) -> BTreeMap<i32, usize> {
        self.lock()
            .iter()
            .map(|(year, bucket)| (*year, bucket.headers.len()))
            .collect()
    }

    /// `"2023: 4, 2024: 1"` over everything recorded so far.
    pub fn year_distribution(&self) -> String {
        format_year_distribution(&self.year_counts())
    }

    /// Remove and return one year's bucket.
    pub fn take(&self, year: i32) -> Option<YearBucket> {
        self.lock().remove(&year)
    }

    /// Consume the aggregator, yielding buckets in ascending year order.
    pub fn into_buckets(self) -> impl Iterator<Item = YearBucket> {
        self.buckets
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_values()
    }
}
