//! Home-currency equivalent of an invoice total.
//!
//! Only a rate embedded in the document is ever used; there is no live
//! foreign-exchange lookup. The policy, in order:
//!
//! 1. a `cac:PricingExchangeRate` (or else `cac:PaymentAlternativeExchangeRate`)
//!    with a usable `cbc:CalculationRate` gives `total × rate`;
//! 2. a total already in the home currency is taken as-is;
//! 3. anything else is reported as zero.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::{RateResolution, RateSource};

/// A rate element as found in the document, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawRate {
    /// Text of the first `cbc:CalculationRate` child, if any.
    pub calculation_rate: Option<String>,
}

/// Decide which embedded rate applies.
///
/// A pricing rate element wins whenever it is present, even if its rate
/// turns out to be unusable; the payment-alternative element is only a
/// fallback for documents without one.
pub(crate) fn resolve_rate(
    pricing: Option<&RawRate>,
    alternative: Option<&RawRate>,
) -> RateResolution {
    let (source, raw) = match (pricing, alternative) {
        (Some(raw), _) => (RateSource::Pricing, raw),
        (None, Some(raw)) => (RateSource::PaymentAlternative, raw),
        (None, None) => return RateResolution::Absent,
    };

    let Some(text) = raw.calculation_rate.as_deref().map(str::trim) else {
        return RateResolution::Unresolved {
            source,
            reason: "no cbc:CalculationRate child".into(),
        };
    };

    match Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
        Ok(rate) => RateResolution::Resolved { source, rate },
        Err(e) => RateResolution::Unresolved {
            source,
            reason: format!("calculation rate '{text}' is not a number: {e}"),
        },
    }
}

/// Apply the equivalent policy to a total.
pub fn local_equivalent(
    total: Decimal,
    currency: &str,
    resolution: &RateResolution,
    home_currency: &str,
) -> Decimal {
    match resolution.rate() {
        // Overflow counts as no usable rate.
        Some(rate) => total.checked_mul(rate).unwrap_or(Decimal::ZERO),
        None if currency == home_currency => total,
        None => Decimal::ZERO,
    }
}
