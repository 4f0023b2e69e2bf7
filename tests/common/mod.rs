#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Knobs for a generated UBL-TR invoice document.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub number: &'static str,
    pub issue_date: &'static str,
    pub order: Option<(&'static str, &'static str)>,
    pub total: &'static str,
    pub currency: &'static str,
    pub pricing_rate: Option<&'static str>,
    pub alternative_rate: Option<&'static str>,
    pub lines: Vec<LineFixture>,
}

#[derive(Debug, Clone)]
pub struct LineFixture {
    pub id: &'static str,
    pub item: &'static str,
    pub quantity: &'static str,
    pub price: &'static str,
    pub percent: Option<&'static str>,
    pub tax: &'static str,
    pub total: &'static str,
    pub currency: &'static str,
}

impl Default for LineFixture {
    fn default() -> Self {
        Self {
            id: "1",
            item: "Danışmanlık",
            quantity: "1",
            price: "100.00",
            percent: Some("20"),
            tax: "20.00",
            total: "100.00",
            currency: "TRY",
        }
    }
}

impl Fixture {
    pub fn new(number: &'static str, issue_date: &'static str) -> Self {
        Self {
            number,
            issue_date,
            order: None,
            total: "100.00",
            currency: "TRY",
            pricing_rate: None,
            alternative_rate: None,
            lines: Vec::new(),
        }
    }

    pub fn order(mut self, number: &'static str, date: &'static str) -> Self {
        self.order = Some((number, date));
        self
    }

    pub fn total(mut self, amount: &'static str, currency: &'static str) -> Self {
        self.total = amount;
        self.currency = currency;
        self
    }

    pub fn pricing_rate(mut self, rate: &'static str) -> Self {
        self.pricing_rate = Some(rate);
        self
    }

    pub fn alternative_rate(mut self, rate: &'static str) -> Self {
        self.alternative_rate = Some(rate);
        self
    }

    pub fn line(mut self, line: LineFixture) -> Self {
        self.lines.push(line);
        self
    }

    pub fn xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"
         xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
         xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <cbc:UBLVersionID>2.1</cbc:UBLVersionID>
  <cbc:CustomizationID>TR1.2</cbc:CustomizationID>
  <cbc:ProfileID>TICARIFATURA</cbc:ProfileID>
"#,
        );
        xml.push_str(&format!("  <cbc:ID>{}</cbc:ID>\n", self.number));
        xml.push_str(&format!("  <cbc:IssueDate>{}</cbc:IssueDate>\n", self.issue_date));
        xml.push_str("  <cbc:InvoiceTypeCode>SATIS</cbc:InvoiceTypeCode>\n");
        if let Some((number, date)) = self.order {
            xml.push_str(&format!(
                "  <cac:OrderReference><cbc:ID>{number}</cbc:ID><cbc:IssueDate>{date}</cbc:IssueDate></cac:OrderReference>\n"
            ));
        }
        xml.push_str(
            r#"  <cac:AccountingSupplierParty><cac:Party>
    <cac:PartyIdentification><cbc:ID schemeID="VKN">1234567890</cbc:ID></cac:PartyIdentification>
    <cac:PartyName><cbc:Name>Tedarik A.Ş.</cbc:Name></cac:PartyName>
  </cac:Party></cac:AccountingSupplierParty>
  <cac:AccountingCustomerParty><cac:Party>
    <cac:PartyName><cbc:Name>Müşteri Ltd. Şti.</cbc:Name></cac:PartyName>
  </cac:Party></cac:AccountingCustomerParty>
"#,
        );
        if let Some(rate) = self.pricing_rate {
            xml.push_str(&format!(
                "  <cac:PricingExchangeRate><cbc:SourceCurrencyCode>{}</cbc:SourceCurrencyCode><cbc:TargetCurrencyCode>TRY</cbc:TargetCurrencyCode><cbc:CalculationRate>{rate}</cbc:CalculationRate></cac:PricingExchangeRate>\n",
                self.currency
            ));
        }
        if let Some(rate) = self.alternative_rate {
            xml.push_str(&format!(
                "  <cac:PaymentAlternativeExchangeRate><cbc:CalculationRate>{rate}</cbc:CalculationRate></cac:PaymentAlternativeExchangeRate>\n"
            ));
        }
        xml.push_str(&format!(
            "  <cac:LegalMonetaryTotal>\n    <cbc:LineExtensionAmount currencyID=\"{c}\">{t}</cbc:LineExtensionAmount>\n    <cbc:TaxInclusiveAmount currencyID=\"{c}\">{t}</cbc:TaxInclusiveAmount>\n    <cbc:PayableAmount currencyID=\"{c}\">{t}</cbc:PayableAmount>\n  </cac:LegalMonetaryTotal>\n",
            c = self.currency,
            t = self.total
        ));
        for line in &self.lines {
            xml.push_str(&format!(
                "  <cac:InvoiceLine>\n    <cbc:ID>{}</cbc:ID>\n    <cbc:InvoicedQuantity unitCode=\"C62\">{}</cbc:InvoicedQuantity>\n    <cbc:LineExtensionAmount currencyID=\"{}\">{}</cbc:LineExtensionAmount>\n    <cac:TaxTotal>\n      <cbc:TaxAmount currencyID=\"{}\">{}</cbc:TaxAmount>\n      <cac:TaxSubtotal>\n        <cbc:TaxAmount currencyID=\"{}\">{}</cbc:TaxAmount>\n{}        <cac:TaxCategory><cac:TaxScheme><cbc:Name>KDV</cbc:Name></cac:TaxScheme></cac:TaxCategory>\n      </cac:TaxSubtotal>\n    </cac:TaxTotal>\n    <cac:Item><cbc:Name>{}</cbc:Name></cac:Item>\n    <cac:Price><cbc:PriceAmount currencyID=\"{}\">{}</cbc:PriceAmount></cac:Price>\n  </cac:InvoiceLine>\n",
                line.id,
                line.quantity,
                line.currency,
                line.total,
                line.currency,
                line.tax,
                line.currency,
                line.tax,
                line.percent
                    .map(|p| format!("        <cbc:Percent>{p}</cbc:Percent>\n"))
                    .unwrap_or_default(),
                line.item,
                line.currency,
                line.price,
            ));
        }
        xml.push_str("</Invoice>\n");
        xml
    }
}

/// In-memory zip with the given entries.
pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Zip around a single invoice document, as the portals deliver them.
pub fn wrapped_invoice(fixture: &Fixture) -> Vec<u8> {
    let name = format!("{}.xml", fixture.number);
    zip_bytes(&[(name.as_str(), fixture.xml().into_bytes())])
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// Read one part of a zip package as text.
pub fn zip_part(path: &Path, name: &str) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut out = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
    out
}
