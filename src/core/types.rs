use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default currency assumed when an amount carries no `currencyID`.
pub const HOME_CURRENCY: &str = "TRY";

/// Invoice-level data read from one UBL-TR document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// `cac:OrderReference/cbc:IssueDate`, empty when the document has no order reference.
    pub order_date: String,
    /// `cac:OrderReference/cbc:ID`, empty when the document has no order reference.
    pub order_number: String,
    /// Document-level `cbc:ID`.
    pub invoice_number: String,
    /// Document-level `cbc:IssueDate`.
    pub issue_date: NaiveDate,
    /// Supplier party name.
    pub seller_name: String,
    /// Customer party name.
    pub buyer_name: String,
    /// `cac:LegalMonetaryTotal/cbc:TaxInclusiveAmount`.
    pub total: Decimal,
    /// Currency of `total` (ISO 4217).
    pub currency: String,
    /// `total` expressed in the home currency.
    pub local_equivalent: Decimal,
}

impl InvoiceHeader {
    /// Calendar year the invoice is reported under.
    pub fn year(&self) -> i32 {
        self.issue_date.year()
    }
}

/// One `cac:InvoiceLine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Order number of the owning invoice. A soft key, not an index.
    pub order_number: String,
    pub line_id: String,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT rate in percent, zero when the line states none.
    pub tax_percent: Decimal,
    pub tax_amount: Decimal,
    /// `cbc:LineExtensionAmount`.
    pub line_total: Decimal,
    /// Currency of `line_total`; never checked against the header.
    pub currency: String,
}

/// Where a document's exchange rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    /// `cac:PricingExchangeRate`
    Pricing,
    /// `cac:PaymentAlternativeExchangeRate`
    PaymentAlternative,
}

impl RateSource {
    pub fn element_name(self) -> &'static str {
        match self {
            RateSource::Pricing => "cac:PricingExchangeRate",
            RateSource::PaymentAlternative => "cac:PaymentAlternativeExchangeRate",
        }
    }
}

/// Outcome of looking for an embedded exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateResolution {
    /// A rate element with a usable `cbc:CalculationRate`.
    Resolved { source: RateSource, rate: Decimal },
    /// Neither rate element is present.
    Absent,
    /// A rate element exists but its rate could not be used.
    Unresolved { source: RateSource, reason: String },
}

impl RateResolution {
    pub fn rate(&self) -> Option<Decimal> {
        match self {
            RateResolution::Resolved { rate, .. } => Some(*rate),
            _ => None,
        }
    }
}

/// A successfully parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInvoice {
    pub header: InvoiceHeader,
    pub lines: Vec<InvoiceLine>,
    /// The rate lookup that produced `header.local_equivalent`.
    pub rate: RateResolution,
}

/// All invoices and lines recorded for one calendar year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearBucket {
    pub year: i32,
    pub headers: Vec<InvoiceHeader>,
    pub lines: Vec<InvoiceLine>,
}

impl YearBucket {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    /// Sum of the home-currency equivalents of all headers, or `None` on
    /// overflow.
    pub fn local_total(&self) -> Option<Decimal> {
        self.headers
            .iter()
            .try_fold(Decimal::ZERO, |acc, h| acc.checked_add(h.local_equivalent))
    }
}

/// What a run has achieved so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total_archives: usize,
    pub processed_archives: usize,
    pub invoices_found: usize,
    /// "year: count, year: count" over everything recorded so far.
    pub year_distribution: Option<String>,
}

/// Per-archive result reported after the archive has been handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDetail {
    pub filename: String,
    pub invoice_count: usize,
    pub year_distribution: String,
}

/// Final outcome of [`Engine::run`](crate::engine::Engine::run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Workbooks written, ascending by year.
    pub reports: Vec<std::path::PathBuf>,
    pub total_archives: usize,
    pub processed_archives: usize,
    pub invoices_found: usize,
    /// Archives that could not be opened at all.
    pub failed_archives: Vec<String>,
    /// Documents that failed to parse.
    pub skipped_documents: usize,
    /// Years whose workbook could not be written.
    pub failed_years: Vec<i32>,
    pub cancelled: bool,
}

/// Format per-year counts as `"2023: 4, 2024: 1"`, ascending by year.
pub fn format_year_distribution<'a>(
    counts: impl IntoIterator<Item = (&'a i32, &'a usize)>,
) -> String {
    counts
        .into_iter()
        .map(|(year, count)| format!("{year}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
