//! # efatura
//!
//! Batch processor for Turkish UBL-TR e-invoices (e-Fatura). Walks a
//! directory tree of zip archives exported from invoicing portals, unpacks
//! them (including invoices wrapped in a zip of their own), parses every
//! invoice document and writes one XLSX workbook per issue year.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Foreign-currency totals are converted with the exchange rate embedded in
//! the document itself; see [`ubl::local_equivalent`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use efatura::{Engine, ProgressEvent};
//!
//! let summary = Engine::new("faturalar", "raporlar").run(&|event: &ProgressEvent| {
//!     println!("{}", event.message());
//! })?;
//! for report in &summary.reports {
//!     println!("wrote {}", report.display());
//! }
//! # Ok::<(), efatura::FaturaError>(())
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`core`] | Invoice types, configuration, errors |
//! | [`archive`] | Zip extraction and the scratch workspace |
//! | [`ubl`] | UBL-TR invoice parsing and currency conversion |
//! | [`aggregate`] | Per-year accumulation |
//! | [`report`] | XLSX workbook generation |
//! | [`progress`] | Progress events and listeners |
//! | [`engine`] | Run orchestration |
//!
//! The crate logs through [`tracing`] and never installs a subscriber.

pub mod aggregate;
pub mod archive;
pub mod core;
pub mod engine;
pub mod progress;
pub mod report;
pub mod ubl;

// Re-export the everyday surface at crate root
pub use crate::aggregate::YearAggregator;
pub use crate::core::*;
pub use crate::engine::Engine;
pub use crate::progress::{NoopListener, ProgressEvent, ProgressListener};
pub use crate::report::ReportWriter;
pub use crate::ubl::InvoiceParser;
