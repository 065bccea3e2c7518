//! Canonical textual form for gateway amounts.
//!
//! The gateway echoes the amount back in webhook notifications, sometimes
//! with a different textual rendering than the one we signed ("500" vs
//! "500.00", or a comma decimal separator). Both sides of a signature
//! comparison must normalize to the same canonical string, so this is done
//! on text rather than through floating point.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Malformed amount: '{0}'")]
    Malformed(String),
}

/// Normalizes an amount string to canonical form.
///
/// Comma separators become dots, trailing fractional zeros are stripped,
/// an all-zero fraction is dropped entirely, and leading zeros on the
/// integer part are removed. The result is idempotent: normalizing a
/// canonical string returns it unchanged.
///
/// `"500.00"` becomes `"500"`, `"500,50"` becomes `"500.5"`, `"0500"`
/// becomes `"500"`.
pub fn normalize_amount(raw: &str) -> Result<String, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Malformed(raw.to_string()));
    }

    let replaced = trimmed.replace(',', ".");
    let (int_part, frac_part) = match replaced.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (replaced.as_str(), None),
    };

    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return Err(AmountError::Malformed(raw.to_string()));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Malformed(raw.to_string()));
    }
    if let Some(frac) = frac_part {
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed(raw.to_string()));
        }
    }

    let mut int_norm = int_part.trim_start_matches('0');
    if int_norm.is_empty() {
        int_norm = "0";
    }

    match frac_part.map(|f| f.trim_end_matches('0')).filter(|f| !f.is_empty()) {
        Some(frac) => Ok(format!("{}.{}", int_norm, frac)),
        None => Ok(int_norm.to_string()),
    }
}
