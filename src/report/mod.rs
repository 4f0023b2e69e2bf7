//! Yearly XLSX report generation.
//!
//! One workbook per year bucket with three sheets in fixed order:
//! `Invoices`, `Lines` and `Summary`. Each invoice row's order number links
//! to the first line of that order on the `Lines` sheet.

mod xlsx;
mod xml_writer;

pub use xlsx::{Cell, InternalLink, Sheet, Workbook, cell_ref, column_letter};

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use crate::core::{EngineConfig, FaturaError, InvoiceHeader, InvoiceLine, Result, YearBucket};

pub const INVOICES_SHEET: &str = "Invoices";
pub const LINES_SHEET: &str = "Lines";
pub const SUMMARY_SHEET: &str = "Summary";

/// Column of the order number on the invoices sheet.
const ORDER_COLUMN: usize = 1;

/// Builds and writes yearly workbooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWriter {
    home_currency: String,
    currency_label: String,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            home_currency: config.home_currency.clone(),
            currency_label: config.currency_label.clone(),
        }
    }

    /// Assemble the workbook for one year without touching the disk.
    ///
    /// Fails with [`FaturaError::Report`] when the grand total overflows.
    pub fn build(&self, bucket: &YearBucket) -> Result<Workbook> {
        let mut invoices = self.invoices_sheet(&bucket.headers);
        invoices.links = order_links(&bucket.headers, &bucket.lines);

        let mut workbook = Workbook::new();
        workbook.push(invoices);
        workbook.push(lines_sheet(&bucket.lines));
        workbook.push(self.summary_sheet(bucket)?);
        Ok(workbook)
    }

    /// Write the workbook for `bucket` to `destination`.
    ///
    /// A partially written file is removed on failure.
    pub fn write(&self, bucket: &YearBucket, destination: &Path) -> Result<()> {
        let bytes = self.build(bucket)?.to_bytes()?;
        if let Err(e) = fs::write(destination, bytes) {
            if destination.exists() {
                if let Err(cleanup) = fs::remove_file(destination) {
                    warn!(file = %destination.display(), error = %cleanup, "could not remove partial report");
                }
            }
            return Err(FaturaError::Report(format!(
                "{}: {e}",
                destination.display()
            )));
        }

        info!(
            year = bucket.year,
            invoices = bucket.headers.len(),
            lines = bucket.lines.len(),
            file = %destination.display(),
            "report written"
        );
        Ok(())
    }

    fn invoices_sheet(&self, headers: &[InvoiceHeader]) -> Sheet {
        let home_total = format!("Total ({})", self.home_currency);
        let mut sheet = Sheet::new(
            INVOICES_SHEET,
            labels(&[
                "Order Date",
                "Order No",
                "Invoice No",
                "Issue Date",
                "Seller",
                "Buyer",
                "Total",
                "Currency",
                home_total.as_str(),
            ]),
        );
        sheet.rows = headers
            .iter()
            .map(|h| {
                vec![
                    Cell::text(h.order_date.as_str()),
                    Cell::text(h.order_number.as_str()),
                    Cell::text(h.invoice_number.as_str()),
                    Cell::text(h.issue_date.format("%Y-%m-%d").to_string()),
                    Cell::text(h.seller_name.as_str()),
                    Cell::text(h.buyer_name.as_str()),
                    Cell::Number(h.total),
                    Cell::text(h.currency.as_str()),
                    Cell::Number(h.local_equivalent),
                ]
            })
            .collect();
        sheet
    }

    fn summary_sheet(&self, bucket: &YearBucket) -> Result<Sheet> {
        let total = bucket.local_total().ok_or_else(|| {
            FaturaError::Report(format!("{}: grand total overflows", bucket.year))
        })?;
        let mut sheet = Sheet::new(SUMMARY_SHEET, labels(&["Metric", "Value"]));
        sheet.rows.push(vec![
            Cell::text("Invoice Count"),
            Cell::Number(Decimal::from(bucket.headers.len())),
        ]);
        sheet.rows.push(vec![
            Cell::text(format!("Total in {}", self.home_currency)),
            Cell::text(format_amount(total, &self.currency_label)),
        ]);
        Ok(sheet)
    }
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn lines_sheet(lines: &[InvoiceLine]) -> Sheet {
    let mut sheet = Sheet::new(
        LINES_SHEET,
        labels(&[
            "Order No",
            "Line No",
            "Item",
            "Quantity",
            "Unit Price",
            "Tax Rate",
            "Tax Amount",
            "Line Total",
            "Currency",
        ]),
    );
    sheet.rows = lines
        .iter()
        .map(|l| {
            vec![
                Cell::text(l.order_number.as_str()),
                Cell::text(l.line_id.as_str()),
                Cell::text(l.item_name.as_str()),
                Cell::Number(l.quantity),
                Cell::Number(l.unit_price),
                Cell::Number(l.tax_percent),
                Cell::Number(l.tax_amount),
                Cell::Number(l.line_total),
                Cell::text(l.currency.as_str()),
            ]
        })
        .collect();
    sheet
}

/// Link each non-empty order number to the first line row of that order.
///
/// Scans the lines once per invoice, so cost grows with headers × lines.
fn order_links(headers: &[InvoiceHeader], lines: &[InvoiceLine]) -> Vec<InternalLink> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.order_number.is_empty())
        .filter_map(|(i, h)| {
            let j = lines.iter().position(|l| l.order_number == h.order_number)?;
            Some(InternalLink {
                cell: cell_ref(ORDER_COLUMN, i + 2),
                location: format!("'{LINES_SHEET}'!{}", cell_ref(0, j + 2)),
            })
        })
        .collect()
}

/// `1234.5` → `"1,234.50 TL"`: two decimals, comma thousands separator.
pub fn format_amount(amount: Decimal, label: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    if label.is_empty() {
        format!("{sign}{grouped}.{frac_part}")
    } else {
        format!("{sign}{grouped}.{frac_part} {label}")
    }
}

/// `<output_dir>/<year><suffix>`.
pub fn report_path(output_dir: &Path, year: i32, config: &EngineConfig) -> PathBuf {
    output_dir.join(config.report_file_name(year))
}
