//! Balance unit conversion
//!
//! Converts human amounts ("1.5", `2`) into the integer minor units a
//! balance transfer takes, and back again for display.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sp_core::U256;
use std::fmt;
use thiserror::Error;

/// Largest integer or fractional part accepted from a JSON number.
///
/// Numbers travel through `f64` in most model SDKs, so anything longer must be
/// sent as a string.
pub const MAX_NUMBER_DIGITS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("For big representation of number, please use a string instead of a number")]
    PrecisionOverflow,

    #[error("Amount has more than {decimals} decimal places and would be truncated")]
    PrecisionLoss { decimals: u32 },

    #[error("Invalid amount '{0}'")]
    Invalid(String),

    #[error("Amount does not fit in the chain balance type")]
    Overflow,
}

/// Amount as extracted from a conversation: either text or a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn is_number(&self) -> bool {
        matches!(self, AmountInput::Number(_))
    }

    fn to_text(&self) -> String {
        match self {
            AmountInput::Text(s) => s.trim().to_string(),
            AmountInput::Number(n) => expand_exponent(&n.to_string()),
        }
    }
}

/// Rewrite `1e-6` or `1.5e16` as plain decimal digits.
fn expand_exponent(text: &str) -> String {
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return text.to_string();
    };
    let Ok(exponent) = exponent.parse::<i64>() else {
        return text.to_string();
    };

    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", integer, fraction);
    let point = integer.len() as i64 + exponent;

    let expanded = if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (whole, rest) = digits.split_at(point as usize);
        format!("{}.{}", whole, rest)
    };

    // Drop the zeros a mantissa like 0.5e3 leaves in front
    let trimmed = expanded.trim_start_matches('0');
    if trimmed.is_empty() || trimmed.starts_with('.') {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

impl From<u64> for AmountInput {
    fn from(value: u64) -> Self {
        AmountInput::Number(value.into())
    }
}

impl fmt::Display for AmountInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Integer quantity of the chain's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinorUnitAmount(U256);

impl MinorUnitAmount {
    pub fn from_u128(value: u128) -> Self {
        Self(U256::from(value))
    }

    /// Narrow to the `u128` balance type used by Substrate runtimes.
    pub fn to_u128(&self) -> Result<u128, AmountError> {
        if self.0 > U256::from(u128::MAX) {
            return Err(AmountError::Overflow);
        }
        Ok(self.0.low_u128())
    }
}

impl fmt::Display for MinorUnitAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert `value` to minor units at `decimals` precision.
///
/// Fractional digits beyond `decimals` are truncated. Use [`normalize_exact`]
/// when truncation must be refused instead.
pub fn normalize(value: &AmountInput, decimals: u32) -> Result<MinorUnitAmount, AmountError> {
    let text = value.to_text();
    let (integer, fraction) = split_parts(&text)?;

    if value.is_number()
        && (integer.len() > MAX_NUMBER_DIGITS
            || fraction.is_some_and(|f| f.len() > MAX_NUMBER_DIGITS))
    {
        return Err(AmountError::PrecisionOverflow);
    }

    let scale = U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(AmountError::Overflow)?;
    let mut total = parse_digits(integer)?
        .checked_mul(scale)
        .ok_or(AmountError::Overflow)?;

    if let Some(fraction) = fraction {
        let padded: String = fraction
            .chars()
            .chain(std::iter::repeat('0'))
            .take(decimals as usize)
            .collect();
        total = total
            .checked_add(parse_digits(&padded)?)
            .ok_or(AmountError::Overflow)?;
    }

    Ok(MinorUnitAmount(total))
}

/// Like [`normalize`], but fails with `PrecisionLoss` rather than dropping
/// non-zero fractional digits.
pub fn normalize_exact(
    value: &AmountInput,
    decimals: u32,
) -> Result<MinorUnitAmount, AmountError> {
    let text = value.to_text();
    let (_, fraction) = split_parts(&text)?;
    if let Some(fraction) = fraction {
        let dropped = fraction.get(decimals as usize..).unwrap_or("");
        if dropped.chars().any(|c| c != '0') {
            return Err(AmountError::PrecisionLoss { decimals });
        }
    }
    normalize(value, decimals)
}

/// Render minor units as a trimmed decimal string.
pub fn format_units(value: u128, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Split into integer and (non-empty) fractional digit strings.
fn split_parts(text: &str) -> Result<(&str, Option<&str>), AmountError> {
    let mut parts = text.split('.');
    let integer = parts.next().unwrap_or("");
    let fraction = parts.next().filter(|f| !f.is_empty());
    if parts.next().is_some() {
        return Err(AmountError::Invalid(text.to_string()));
    }

    if integer.is_empty() && fraction.is_none() {
        return Err(AmountError::Invalid(text.to_string()));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(integer) || !fraction.map_or(true, all_digits) {
        return Err(AmountError::Invalid(text.to_string()));
    }

    Ok((integer, fraction))
}

fn parse_digits(digits: &str) -> Result<U256, AmountError> {
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| AmountError::Overflow)
}
