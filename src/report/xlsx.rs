//! Minimal SpreadsheetML package writer.
//!
//! Produces just enough of an Office Open XML workbook for the yearly
//! reports: inline-string and numeric cells, a bold header style, column
//! widths and in-workbook hyperlinks.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::xml_writer::XmlWriter;
use crate::core::FaturaError;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const CT_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Index into `cellXfs` of the stylesheet below.
const STYLE_HEADER: &str = "1";
const STYLE_HYPERLINK: &str = "2";

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(Decimal),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// The string a reader sees, used for column sizing.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(d) => d.to_string(),
        }
    }
}

/// A hyperlink from one cell to a location inside the same workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalLink {
    /// Cell carrying the link, e.g. `B2`.
    pub cell: String,
    /// Target, e.g. `'Lines'!A7`.
    pub location: String,
}

/// One worksheet: a bold header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub links: Vec<InternalLink>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            name: name.into(),
            header,
            rows: Vec::new(),
            links: Vec::new(),
        }
    }

    fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// Width of every column: the longest label or value, plus two.
    pub fn column_widths(&self) -> Vec<usize> {
        (0..self.column_count())
            .map(|col| {
                let label = self.header.get(col).map_or(0, |h| h.chars().count());
                let widest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.display().chars().count())
                    .max()
                    .unwrap_or(0);
                label.max(widest) + 2
            })
            .collect()
    }

    fn to_xml(&self) -> Result<Vec<u8>, FaturaError> {
        let mut w = XmlWriter::new()?;
        w.start_element_with_attrs("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;

        let columns = self.column_count();
        let last_row = self.rows.len() + 1;
        if columns > 0 {
            let dimension = format!("A1:{}{last_row}", column_letter(columns - 1));
            w.empty_element("dimension", &[("ref", dimension.as_str())])?;

            w.start_element("cols")?;
            for (i, width) in self.column_widths().iter().enumerate() {
                let index = (i + 1).to_string();
                let width = width.to_string();
                w.empty_element(
                    "col",
                    &[
                        ("min", index.as_str()),
                        ("max", index.as_str()),
                        ("width", width.as_str()),
                        ("customWidth", "1"),
                    ],
                )?;
            }
            w.end_element("cols")?;
        }

        w.start_element("sheetData")?;
        let header: Vec<Cell> = self.header.iter().map(|h| Cell::text(h.as_str())).collect();
        write_row(&mut w, 1, &header, |_| Some(STYLE_HEADER))?;
        let linked: HashSet<&str> = self.links.iter().map(|l| l.cell.as_str()).collect();
        for (i, row) in self.rows.iter().enumerate() {
            let r = i + 2;
            write_row(&mut w, r, row, |reference| {
                linked.contains(reference).then_some(STYLE_HYPERLINK)
            })?;
        }
        w.end_element("sheetData")?;

        if !self.links.is_empty() {
            w.start_element("hyperlinks")?;
            for link in &self.links {
                w.empty_element(
                    "hyperlink",
                    &[("ref", link.cell.as_str()), ("location", link.location.as_str())],
                )?;
            }
            w.end_element("hyperlinks")?;
        }

        w.end_element("worksheet")?;
        Ok(w.into_bytes())
    }
}

fn write_row(
    w: &mut XmlWriter,
    r: usize,
    cells: &[Cell],
    style: impl Fn(&str) -> Option<&'static str>,
) -> Result<(), FaturaError> {
    let row_ref = r.to_string();
    w.start_element_with_attrs("row", &[("r", row_ref.as_str())])?;
    for (c, cell) in cells.iter().enumerate() {
        let reference = cell_ref(c, r);
        let mut attrs: Vec<(&str, &str)> = vec![("r", reference.as_str())];
        if let Some(s) = style(&reference) {
            attrs.push(("s", s));
        }
        match cell {
            Cell::Text(text) => {
                attrs.push(("t", "inlineStr"));
                w.start_element_with_attrs("c", &attrs)?;
                w.start_element("is")?;
                if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                    w.text_element_with_attrs("t", text, &[("xml:space", "preserve")])?;
                } else {
                    w.text_element("t", text)?;
                }
                w.end_element("is")?;
                w.end_element("c")?;
            }
            Cell::Number(n) => {
                w.start_element_with_attrs("c", &attrs)?;
                w.text_element("v", &n.to_string())?;
                w.end_element("c")?;
            }
        }
    }
    w.end_element("row")?;
    Ok(())
}

/// Zero-based column index to spreadsheet letters: 0 → A, 26 → AA.
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A1-style reference for a zero-based column and one-based row.
pub fn cell_ref(column: usize, row: usize) -> String {
    format!("{}{row}", column_letter(column))
}

/// A workbook: an ordered list of sheets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Serialize the package into xlsx bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FaturaError> {
        if self.sheets.is_empty() {
            return Err(FaturaError::Report("workbook has no sheets".into()));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut put = |name: &str, bytes: Vec<u8>| -> Result<(), FaturaError> {
            zip.start_file(name, options)?;
            zip.write_all(&bytes)?;
            Ok(())
        };

        put("[Content_Types].xml", self.content_types_xml()?)?;
        put("_rels/.rels", root_rels_xml()?)?;
        put("xl/workbook.xml", self.workbook_xml()?)?;
        put("xl/_rels/workbook.xml.rels", self.workbook_rels_xml()?)?;
        put("xl/styles.xml", styles_xml()?)?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            put(&format!("xl/worksheets/sheet{}.xml", i + 1), sheet.to_xml()?)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types_xml(&self) -> Result<Vec<u8>, FaturaError> {
        let mut w = XmlWriter::new()?;
        w.start_element_with_attrs("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
        w.empty_element("Default", &[("Extension", "rels"), ("ContentType", CT_RELS)])?;
        w.empty_element(
            "Default",
            &[("Extension", "xml"), ("ContentType", "application/xml")],
        )?;
        w.empty_element(
            "Override",
            &[("PartName", "/xl/workbook.xml"), ("ContentType", CT_WORKBOOK)],
        )?;
        w.empty_element(
            "Override",
            &[("PartName", "/xl/styles.xml"), ("ContentType", CT_STYLES)],
        )?;
        for i in 1..=self.sheets.len() {
            let part = format!("/xl/worksheets/sheet{i}.xml");
            w.empty_element("Override", &[("PartName", part.as_str()), ("ContentType", CT_WORKSHEET)])?;
        }
        w.end_element("Types")?;
        Ok(w.into_bytes())
    }

    fn workbook_xml(&self) -> Result<Vec<u8>, FaturaError> {
        let mut w = XmlWriter::new()?;
        w.start_element_with_attrs("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
        w.start_element("sheets")?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            let id = (i + 1).to_string();
            let rid = format!("rId{id}");
            w.empty_element(
                "sheet",
                &[("name", sheet.name.as_str()), ("sheetId", id.as_str()), ("r:id", rid.as_str())],
            )?;
        }
        w.end_element("sheets")?;
        w.end_element("workbook")?;
        Ok(w.into_bytes())
    }

    fn workbook_rels_xml(&self) -> Result<Vec<u8>, FaturaError> {
        let mut w = XmlWriter::new()?;
        w.start_element_with_attrs("Relationships", &[("xmlns", NS_PKG_REL)])?;
        for i in 1..=self.sheets.len() {
            let rid = format!("rId{i}");
            let target = format!("worksheets/sheet{i}.xml");
            w.empty_element(
                "Relationship",
                &[("Id", rid.as_str()), ("Type", REL_WORKSHEET), ("Target", target.as_str())],
            )?;
        }
        let styles_id = format!("rId{}", self.sheets.len() + 1);
        w.empty_element(
            "Relationship",
            &[("Id", styles_id.as_str()), ("Type", REL_STYLES), ("Target", "styles.xml")],
        )?;
        w.end_element("Relationships")?;
        Ok(w.into_bytes())
    }
}

fn root_rels_xml() -> Result<Vec<u8>, FaturaError> {
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("Relationships", &[("xmlns", NS_PKG_REL)])?;
    w.empty_element(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", REL_OFFICE_DOCUMENT),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    w.end_element("Relationships")?;
    Ok(w.into_bytes())
}

/// Fonts: 0 regular, 1 bold (header), 2 blue underlined (hyperlink).
fn styles_xml() -> Result<Vec<u8>, FaturaError> {
    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("styleSheet", &[("xmlns", NS_MAIN)])?;

    w.start_element_with_attrs("fonts", &[("count", "3")])?;
    font(&mut w, false, false)?;
    font(&mut w, true, false)?;
    font(&mut w, false, true)?;
    w.end_element("fonts")?;

    w.start_element_with_attrs("fills", &[("count", "2")])?;
    for pattern in ["none", "gray125"] {
        w.start_element("fill")?;
        w.empty_element("patternFill", &[("patternType", pattern)])?;
        w.end_element("fill")?;
    }
    w.end_element("fills")?;

    w.start_element_with_attrs("borders", &[("count", "1")])?;
    w.start_element("border")?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        w.empty_element(side, &[])?;
    }
    w.end_element("border")?;
    w.end_element("borders")?;

    w.start_element_with_attrs("cellStyleXfs", &[("count", "1")])?;
    w.empty_element(
        "xf",
        &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")],
    )?;
    w.end_element("cellStyleXfs")?;

    // Order matches STYLE_HEADER and STYLE_HYPERLINK.
    w.start_element_with_attrs("cellXfs", &[("count", "3")])?;
    for font_id in ["0", "1", "2"] {
        w.empty_element(
            "xf",
            &[
                ("numFmtId", "0"),
                ("fontId", font_id),
                ("fillId", "0"),
                ("borderId", "0"),
                ("xfId", "0"),
                ("applyFont", if font_id == "0" { "0" } else { "1" }),
            ],
        )?;
    }
    w.end_element("cellXfs")?;

    w.start_element_with_attrs("cellStyles", &[("count", "1")])?;
    w.empty_element("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    w.end_element("cellStyles")?;

    w.end_element("styleSheet")?;
    Ok(w.into_bytes())
}

fn font(w: &mut XmlWriter, bold: bool, link: bool) -> Result<(), FaturaError> {
    w.start_element("font")?;
    if bold {
        w.empty_element("b", &[])?;
    }
    if link {
        w.empty_element("u", &[])?;
        w.empty_element("color", &[("rgb", "FF0563C1")])?;
    }
    w.empty_element("sz", &[("val", "11")])?;
    w.empty_element("name", &[("val", "Calibri")])?;
    w.end_element("font")?;
    Ok(())
}
