//! UBL-TR invoice extraction.
//!
//! Reads the handful of header and line fields the yearly reports need from
//! a UBL 2.1 invoice as issued by the Turkish e-Fatura system. Elements are
//! matched by namespace URI, not by prefix.
//!
//! # Example
//!
//! ```no_run
//! use efatura::ubl::InvoiceParser;
//! use std::path::Path;
//!
//! let parser = InvoiceParser::new();
//! if let Some(parsed) = parser.parse_path(Path::new("fatura.xml")).unwrap() {
//!     println!("{} {}", parsed.header.invoice_number, parsed.header.local_equivalent);
//! }
//! ```

mod exchange;
mod parse;

pub use exchange::local_equivalent;
pub use parse::parse_invoice_xml;

use std::fs;
use std::path::Path;

use crate::archive;
use crate::core::{FaturaError, HOME_CURRENCY, ParsedInvoice};

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses invoice documents from disk.
#[derive(Debug, Clone)]
pub struct InvoiceParser {
    home_currency: String,
}

impl Default for InvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser {
    pub fn new() -> Self {
        Self {
            home_currency: HOME_CURRENCY.to_string(),
        }
    }

    /// Use a different home currency for defaults and conversion.
    pub fn with_home_currency(mut self, currency: impl Into<String>) -> Self {
        self.home_currency = currency.into();
        self
    }

    pub fn home_currency(&self) -> &str {
        &self.home_currency
    }

    /// Parse the document at `path`.
    ///
    /// Returns `Ok(None)` for directories. A `.zip` file is taken as a
    /// wrapper around a single XML document, which is read without being
    /// written to disk.
    pub fn parse_path(&self, path: &Path) -> Result<Option<ParsedInvoice>, FaturaError> {
        if path.is_dir() {
            return Ok(None);
        }

        let bytes = if archive::is_zip_path(path) {
            archive::read_first_xml(path)?
        } else {
            fs::read(path)?
        };

        self.parse_bytes(&bytes).map(Some)
    }

    /// Parse a document held in memory.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedInvoice, FaturaError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| FaturaError::Xml(format!("document is not UTF-8: {e}")))?;
        self.parse_str(xml)
    }

    pub fn parse_str(&self, xml: &str) -> Result<ParsedInvoice, FaturaError> {
        parse_invoice_xml(xml, &self.home_currency)
    }
}
