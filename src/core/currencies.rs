//! ISO 4217 currency codes seen on UBL-TR invoices.
//!
//! Turkish e-invoices are mostly issued in TRY, with EUR, USD and GBP
//! common for export trade. Unknown codes are still accepted; the parser
//! only logs them.

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

/// Take a `currencyID` attribute value as written, falling back to
/// `default` only when the attribute is absent.
///
/// Case and whitespace are kept: `"try"` is not the home currency.
pub fn resolve_currency(attr: Option<&str>, default: &str) -> String {
    attr.map_or_else(|| default.to_string(), str::to_string)
}

/// Sorted for binary search.
static CURRENCY_CODES: &[&str] = &[
    "AED", "AMD", "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK",
    "EGP", "EUR", "GBP", "GEL", "HKD", "HRK", "HUF", "IDR", "ILS", "INR",
    "ISK", "JPY", "KES", "KRW", "KZT", "MXN", "MYR", "NGN", "NOK", "NZD",
    "PHP", "PLN", "RON", "RUB", "SAR", "SEK", "SGD", "THB", "TRY", "TWD",
    "UAH", "USD", "VND", "ZAR",
];
