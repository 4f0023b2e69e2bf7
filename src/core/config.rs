use serde::{Deserialize, Serialize};

use super::types::HOME_CURRENCY;

/// Engine settings.
///
/// Every field has a default, so a partially filled serialized config is
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency whose totals are taken as-is when no rate is embedded.
    pub home_currency: String,
    /// Label appended to the grand total on the summary sheet.
    pub currency_label: String,
    /// Name of the scratch directory created inside the output directory.
    pub scratch_dir_name: String,
    /// Appended to the year to form the workbook file name.
    pub report_suffix: String,
    /// How many levels of archives-inside-archives are unpacked.
    pub max_nesting_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_currency: HOME_CURRENCY.into(),
            currency_label: "TL".into(),
            scratch_dir_name: "temp".into(),
            report_suffix: "_report.xlsx".into(),
            max_nesting_depth: 1,
        }
    }
}

impl EngineConfig {
    /// File name of the workbook for `year`.
    pub fn report_file_name(&self, year: i32) -> String {
        format!("{year}{}", self.report_suffix)
    }
}
