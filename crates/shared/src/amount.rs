//! Exact token amount arithmetic.
//!
//! On-chain balances routinely exceed the range where `f64` is exact, so every
//! conversion between display values and base units goes through
//! [`BigDecimal`] / [`BigInt`].

use std::{fmt, str::FromStr};

use bigdecimal::{
    num_bigint::{BigInt, Sign},
    BigDecimal,
};
use thiserror::Error;

const MAX_INPUT_LEN: usize = 128;
/// uint256 has 78 decimal digits; anything beyond that cannot be a token amount.
const MAX_INTEGER_DIGITS: i64 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a decimal number: {0}")]
    Invalid(String),
    #[error("amount must not be negative: {0}")]
    Negative(String),
    #[error("amount {value} has more than {decimals} fractional digits")]
    TooPrecise { value: String, decimals: u8 },
    #[error("amount is too large: {0}")]
    Overflow(String),
}

/// An integer number of base units paired with the token's decimals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenAmount {
    raw: BigInt,
    decimals: u8,
}

fn pow10(exponent: u8) -> BigInt {
    BigInt::from(10u8).pow(u32::from(exponent))
}

impl TokenAmount {
    pub fn from_base_units(raw: BigInt, decimals: u8) -> Result<Self, AmountError> {
        if raw.sign() == Sign::Minus {
            return Err(AmountError::Negative(raw.to_string()));
        }
        Ok(Self { raw, decimals })
    }

    /// Parses a base-10 integer string as returned by token contracts.
    pub fn parse_base_units(raw: &str, decimals: u8) -> Result<Self, AmountError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        let value = BigInt::from_str(trimmed)
            .map_err(|_| AmountError::Invalid(trimmed.to_string()))?;
        Self::from_base_units(value, decimals)
    }

    /// Scales a user-entered display amount (`"0.01"`) into base units.
    ///
    /// Fails instead of rounding when the input carries more fractional digits
    /// than the token supports.
    pub fn parse_display(input: &str, decimals: u8) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        if trimmed.len() > MAX_INPUT_LEN {
            return Err(AmountError::Overflow(format!("{} characters", trimmed.len())));
        }

        let value = BigDecimal::from_str(trimmed)
            .map_err(|_| AmountError::Invalid(trimmed.to_string()))?;
        let (mantissa, scale) = value.as_bigint_and_exponent();
        if scale < -MAX_INTEGER_DIGITS {
            return Err(AmountError::Overflow(trimmed.to_string()));
        }
        if value.sign() == Sign::Minus {
            return Err(AmountError::Negative(trimmed.to_string()));
        }
        // The mantissa has at most MAX_INPUT_LEN digits, so stripping trailing
        // zeros can never bring a larger scale back within `decimals`.
        if scale > i64::from(decimals) + MAX_INPUT_LEN as i64 {
            if mantissa.sign() == Sign::NoSign {
                return Self::from_base_units(BigInt::from(0u8), decimals);
            }
            return Err(AmountError::TooPrecise {
                value: trimmed.to_string(),
                decimals,
            });
        }

        let scaled = value * BigDecimal::new(BigInt::from(1u8), -i64::from(decimals));
        if !scaled.is_integer() {
            return Err(AmountError::TooPrecise {
                value: trimmed.to_string(),
                decimals,
            });
        }
        let (raw, _) = scaled.with_scale(0).into_bigint_and_exponent();
        Self::from_base_units(raw, decimals)
    }

    pub fn base_units(&self) -> &BigInt {
        &self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn to_decimal(&self) -> BigDecimal {
        BigDecimal::new(self.raw.clone(), i64::from(self.decimals))
    }

    pub fn is_zero(&self) -> bool {
        self.raw.sign() == Sign::NoSign
    }
}

impl fmt::Display for TokenAmount {
    /// Plain decimal notation with trailing fractional zeros removed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals == 0 {
            return write!(f, "{}", self.raw);
        }
        let unit = pow10(self.decimals);
        let whole = &self.raw / &unit;
        let fraction = &self.raw % &unit;
        if fraction.sign() == Sign::NoSign {
            return write!(f, "{whole}");
        }
        let padded = format!(
            "{:0>width$}",
            fraction.to_string(),
            width = usize::from(self.decimals)
        );
        write!(f, "{whole}.{}", padded.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_full_token_at_eighteen_decimals() {
        let balance = TokenAmount::parse_base_units("1000000000000000000", 18).expect("balance");
        assert_eq!(balance.to_string(), "1");
    }

    #[test]
    fn default_transfer_amount_scales_exactly() {
        let amount = TokenAmount::parse_display("0.01", 18).expect("amount");
        assert_eq!(amount.base_units().to_string(), "10000000000000000");
    }

    #[test]
    fn balances_beyond_f64_precision_stay_exact() {
        let raw = "123456789012345678901234567890123";
        let balance = TokenAmount::parse_base_units(raw, 18).expect("balance");
        assert_eq!(balance.to_string(), "123456789012345.678901234567890123");
    }

    #[test]
    fn display_amounts_survive_scaling_and_formatting() {
        let cases = [
            ("0.01", 18),
            ("1", 18),
            ("0.000000000000000001", 18),
            ("98765432109876543210.5", 18),
            ("42", 0),
            ("3.25", 6),
            ("1000", 2),
        ];
        for (input, decimals) in cases {
            let amount = TokenAmount::parse_display(input, decimals).expect(input);
            let reparsed =
                TokenAmount::parse_base_units(&amount.base_units().to_string(), decimals)
                    .expect("base units");
            assert_eq!(reparsed.to_string(), input, "decimals={decimals}");
        }
    }

    #[test]
    fn small_fractions_keep_leading_zeros() {
        let amount = TokenAmount::parse_base_units("5", 6).expect("amount");
        assert_eq!(amount.to_string(), "0.000005");
    }

    #[test]
    fn rejects_amounts_finer_than_token_precision() {
        assert_eq!(
            TokenAmount::parse_display("0.001", 2),
            Err(AmountError::TooPrecise {
                value: "0.001".to_string(),
                decimals: 2
            })
        );
    }

    #[test]
    fn tiny_exponents_are_rejected_without_scaling() {
        assert_eq!(
            TokenAmount::parse_display("1e-20000000", 18),
            Err(AmountError::TooPrecise {
                value: "1e-20000000".to_string(),
                decimals: 18
            })
        );
        let zero = TokenAmount::parse_display("0e-20000000", 18).expect("zero");
        assert!(zero.is_zero());
        let fine = TokenAmount::parse_display("10000e-22", 18).expect("amount");
        assert_eq!(fine.base_units(), &BigInt::from(1u8));
    }

    #[test]
    fn rejects_negative_empty_and_garbage_input() {
        assert!(matches!(
            TokenAmount::parse_display("-1", 18),
            Err(AmountError::Negative(_))
        ));
        assert_eq!(TokenAmount::parse_display("  ", 18), Err(AmountError::Empty));
        assert!(matches!(
            TokenAmount::parse_display("ten", 18),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            TokenAmount::parse_display("1e200", 18),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn decimal_view_matches_display() {
        let amount = TokenAmount::parse_display("2.5", 18).expect("amount");
        assert_eq!(
            amount.to_decimal(),
            BigDecimal::from_str("2.5").expect("decimal")
        );
        assert!(!amount.is_zero());
    }
}
