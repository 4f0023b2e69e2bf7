use chrono::NaiveDate;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

use super::exchange::{RawRate, local_equivalent, resolve_rate};
use super::ubl_ns;
use crate::core::{
    FaturaError, InvoiceHeader, InvoiceLine, ParsedInvoice, RateResolution, is_known_currency_code,
    resolve_currency,
};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a UBL-TR invoice document.
///
/// `home_currency` is assumed for amounts without a `currencyID` and is the
/// currency whose totals need no conversion.
pub fn parse_invoice_xml(
    xml: &str,
    home_currency: &str,
) -> Result<ParsedInvoice, FaturaError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut scan = DocumentScan::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => {
                let name = qualified_name(&ns, &e);
                scan.open(&path, &name, &e);
                path.push(name);
            }
            Ok((ns, Event::Empty(e))) => {
                let name = qualified_name(&ns, &e);
                scan.open(&path, &name, &e);
                scan.close(&name);
            }
            Ok((_, Event::Text(e))) => {
                let text = e
                    .unescape()
                    .map_err(|err| FaturaError::Xml(format!("bad text content: {err}")))?;
                if !text.is_empty() {
                    scan.text(&path, &text);
                }
            }
            Ok((_, Event::CData(e))) => {
                let text = String::from_utf8_lossy(&e).trim().to_string();
                if !text.is_empty() {
                    scan.text(&path, &text);
                }
            }
            Ok((_, Event::End(_))) => {
                if let Some(ended) = path.pop() {
                    scan.close(&ended);
                }
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                return Err(FaturaError::Xml(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    if scan.root_seen == 0 {
        return Err(FaturaError::Xml("document has no root element".into()));
    }

    scan.into_parsed(home_currency)
}

/// Map a resolved element name onto the `cac:`/`cbc:` vocabulary,
/// regardless of the prefix the document happens to use.
fn qualified_name(ns: &ResolveResult, e: &BytesStart) -> String {
    let local = e.local_name();
    let local = String::from_utf8_lossy(local.as_ref());
    match ns {
        ResolveResult::Bound(Namespace(uri)) if *uri == ubl_ns::CAC.as_bytes() => {
            format!("cac:{local}")
        }
        ResolveResult::Bound(Namespace(uri)) if *uri == ubl_ns::CBC.as_bytes() => {
            format!("cbc:{local}")
        }
        _ => local.into_owned(),
    }
}

fn currency_attr(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"currencyID")
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Raw text collected while streaming through a document. The first
/// occurrence of every field wins, as in a document-order search.
#[derive(Default)]
struct DocumentScan {
    root_seen: usize,

    number: Option<String>,
    issue_date: Option<String>,
    order_number: Option<String>,
    order_date: Option<String>,
    seller_name: Option<String>,
    buyer_name: Option<String>,

    total: Option<String>,
    total_seen: bool,
    total_currency: Option<String>,

    pricing_rate: Option<RawRate>,
    in_pricing_rate: bool,
    alternative_rate: Option<RawRate>,
    in_alternative_rate: bool,

    lines: Vec<LineScan>,
    current_line: Option<LineScan>,
}

#[derive(Default)]
struct LineScan {
    id: Option<String>,
    item_name: Option<String>,
    quantity: Option<String>,
    unit_price: Option<String>,
    tax_percent: Option<String>,
    tax_amount: Option<String>,
    line_total: Option<String>,
    line_total_seen: bool,
    currency: Option<String>,
}

fn set_once(slot: &mut Option<String>, text: &str) {
    if slot.is_none() {
        *slot = Some(text.to_string());
    }
}

impl DocumentScan {
    /// An element named `name` starts below `path`.
    fn open(&mut self, path: &[String], name: &str, e: &BytesStart) {
        if path.is_empty() {
            self.root_seen += 1;
            return;
        }
        let parent = path.last().map(String::as_str).unwrap_or("");

        match name {
            "cac:InvoiceLine" => {
                self.current_line = Some(LineScan::default());
            }
            "cbc:TaxInclusiveAmount" if parent == "cac:LegalMonetaryTotal" && !self.total_seen => {
                self.total_seen = true;
                self.total_currency = currency_attr(e);
            }
            "cac:PricingExchangeRate" if self.pricing_rate.is_none() => {
                self.pricing_rate = Some(RawRate::default());
                self.in_pricing_rate = true;
            }
            "cac:PaymentAlternativeExchangeRate" if self.alternative_rate.is_none() => {
                self.alternative_rate = Some(RawRate::default());
                self.in_alternative_rate = true;
            }
            "cbc:LineExtensionAmount" => {
                if let Some(line) = self.current_line.as_mut() {
                    if !line.line_total_seen {
                        line.line_total_seen = true;
                        line.currency = currency_attr(e);
                    }
                }
            }
            _ => {}
        }
    }

    /// An element named `name` has ended.
    fn close(&mut self, name: &str) {
        match name {
            "cac:InvoiceLine" => {
                if let Some(line) = self.current_line.take() {
                    self.lines.push(line);
                }
            }
            "cac:PricingExchangeRate" => self.in_pricing_rate = false,
            "cac:PaymentAlternativeExchangeRate" => self.in_alternative_rate = false,
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        let leaf = path.last().map(String::as_str).unwrap_or("");
        let parent = if path.len() >= 2 {
            path[path.len() - 2].as_str()
        } else {
            ""
        };
        let at_root_level = path.len() == 2;

        if let Some(line) = self.current_line.as_mut() {
            let in_tax_total = path
                .iter()
                .rev()
                .take_while(|p| *p != "cac:InvoiceLine")
                .any(|p| p == "cac:TaxTotal");
            match leaf {
                "cbc:ID" if parent == "cac:InvoiceLine" => set_once(&mut line.id, text),
                "cbc:Name" if parent == "cac:Item" => set_once(&mut line.item_name, text),
                "cbc:InvoicedQuantity" if parent == "cac:InvoiceLine" => {
                    set_once(&mut line.quantity, text)
                }
                "cbc:PriceAmount" if parent == "cac:Price" => set_once(&mut line.unit_price, text),
                "cbc:Percent" if in_tax_total => set_once(&mut line.tax_percent, text),
                "cbc:TaxAmount" if parent == "cac:TaxTotal" => set_once(&mut line.tax_amount, text),
                "cbc:LineExtensionAmount" => set_once(&mut line.line_total, text),
                _ => {}
            }
        }

        match leaf {
            "cbc:ID" if at_root_level => set_once(&mut self.number, text),
            "cbc:IssueDate" if at_root_level => set_once(&mut self.issue_date, text),
            "cbc:ID" if parent == "cac:OrderReference" => set_once(&mut self.order_number, text),
            "cbc:IssueDate" if parent == "cac:OrderReference" => {
                set_once(&mut self.order_date, text)
            }
            "cbc:Name" if parent == "cac:PartyName" => {
                if path.iter().any(|p| p == "cac:AccountingSupplierParty") {
                    set_once(&mut self.seller_name, text);
                } else if path.iter().any(|p| p == "cac:AccountingCustomerParty") {
                    set_once(&mut self.buyer_name, text);
                }
            }
            "cbc:TaxInclusiveAmount" if parent == "cac:LegalMonetaryTotal" => {
                set_once(&mut self.total, text)
            }
            "cbc:CalculationRate" if parent == "cac:PricingExchangeRate" && self.in_pricing_rate => {
                if let Some(rate) = self.pricing_rate.as_mut() {
                    set_once(&mut rate.calculation_rate, text);
                }
            }
            "cbc:CalculationRate"
                if parent == "cac:PaymentAlternativeExchangeRate" && self.in_alternative_rate =>
            {
                if let Some(rate) = self.alternative_rate.as_mut() {
                    set_once(&mut rate.calculation_rate, text);
                }
            }
            _ => {}
        }
    }

    fn into_parsed(self, home_currency: &str) -> Result<ParsedInvoice, FaturaError> {
        let total = parse_decimal(
            "cac:LegalMonetaryTotal/cbc:TaxInclusiveAmount",
            require(self.total, "cac:LegalMonetaryTotal/cbc:TaxInclusiveAmount")?,
        )?;
        let currency = resolve_currency(self.total_currency.as_deref(), home_currency);
        if !is_known_currency_code(&currency) {
            debug!(currency = %currency, "unrecognised currency code");
        }

        let invoice_number = require(self.number, "cbc:ID")?;
        let issue_date = parse_date("cbc:IssueDate", &require(self.issue_date, "cbc:IssueDate")?)?;
        let seller_name = require(
            self.seller_name,
            "cac:AccountingSupplierParty/cac:PartyName/cbc:Name",
        )?;
        let buyer_name = require(
            self.buyer_name,
            "cac:AccountingCustomerParty/cac:PartyName/cbc:Name",
        )?;

        let rate = resolve_rate(self.pricing_rate.as_ref(), self.alternative_rate.as_ref());
        if let RateResolution::Unresolved { source, reason } = &rate {
            warn!(
                invoice = %invoice_number,
                element = source.element_name(),
                reason = %reason,
                "exchange rate unusable, falling back to currency policy"
            );
        }
        let local = local_equivalent(total, &currency, &rate, home_currency);

        let order_number = self.order_number.unwrap_or_default();
        let lines = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| line.into_line(i + 1, &order_number, home_currency))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ParsedInvoice {
            header: InvoiceHeader {
                order_date: self.order_date.unwrap_or_default(),
                order_number,
                invoice_number,
                issue_date,
                seller_name,
                buyer_name,
                total,
                currency,
                local_equivalent: local,
            },
            lines,
            rate,
        })
    }
}

impl LineScan {
    fn into_line(
        self,
        position: usize,
        order_number: &str,
        home_currency: &str,
    ) -> Result<InvoiceLine, FaturaError> {
        let field = |name: &str| format!("cac:InvoiceLine[{position}]/{name}");
        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| FaturaError::MissingField(field(name)))
        };
        let amount = |value: Option<String>, name: &str| -> Result<Decimal, FaturaError> {
            parse_decimal(&field(name), required(value, name)?)
        };

        let line_id = required(self.id, "cbc:ID")?;
        let item_name = required(self.item_name, "cac:Item/cbc:Name")?;
        let quantity = amount(self.quantity, "cbc:InvoicedQuantity")?;
        let unit_price = amount(self.unit_price, "cac:Price/cbc:PriceAmount")?;
        let tax_percent = match self.tax_percent {
            Some(p) => parse_decimal(&field("cac:TaxTotal/cbc:Percent"), p)?,
            None => Decimal::ZERO,
        };
        let tax_amount = amount(self.tax_amount, "cac:TaxTotal/cbc:TaxAmount")?;
        let line_total = amount(self.line_total, "cbc:LineExtensionAmount")?;

        Ok(InvoiceLine {
            order_number: order_number.to_string(),
            line_id,
            item_name,
            quantity,
            unit_price,
            tax_percent,
            tax_amount,
            line_total,
            currency: resolve_currency(self.currency.as_deref(), home_currency),
        })
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, FaturaError> {
    value.ok_or_else(|| FaturaError::MissingField(field.to_string()))
}

fn parse_decimal(field: &str, text: String) -> Result<Decimal, FaturaError> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| FaturaError::invalid(field, text.as_str()))
}

fn parse_date(field: &str, text: &str) -> Result<NaiveDate, FaturaError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| FaturaError::invalid(field, text))
}
