//! The three ERC-20 calls the wallet needs, encoded by hand.

use bigdecimal::num_bigint::{BigInt, Sign};
use shared::domain::AccountAddress;
use thiserror::Error;

pub const BALANCE_OF_SELECTOR: &str = "70a08231";
pub const DECIMALS_SELECTOR: &str = "313ce567";
pub const TRANSFER_SELECTOR: &str = "a9059cbb";

const WORD_HEX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("uint256 cannot hold {0}")]
    OutOfRange(String),
    #[error("call returned no data")]
    EmptyReturn,
    #[error("invalid hex value: {0}")]
    InvalidHex(String),
}

fn encode_address(address: &AccountAddress) -> String {
    format!("{:0>width$}", address.digits(), width = WORD_HEX_LEN)
}

fn encode_uint(value: &BigInt) -> Result<String, AbiError> {
    if value.sign() == Sign::Minus || value.bits() > 256 {
        return Err(AbiError::OutOfRange(value.to_string()));
    }
    Ok(format!("{:0>width$}", value.to_str_radix(16), width = WORD_HEX_LEN))
}

pub fn balance_of_call(owner: &AccountAddress) -> String {
    format!("0x{BALANCE_OF_SELECTOR}{}", encode_address(owner))
}

pub fn decimals_call() -> String {
    format!("0x{DECIMALS_SELECTOR}")
}

pub fn transfer_call(recipient: &AccountAddress, amount: &BigInt) -> Result<String, AbiError> {
    Ok(format!(
        "0x{TRANSFER_SELECTOR}{}{}",
        encode_address(recipient),
        encode_uint(amount)?
    ))
}

/// Decodes the first word of an `eth_call` return value as an unsigned integer.
pub fn decode_uint(raw: &str) -> Result<BigInt, AbiError> {
    let digits = strip_hex_prefix(raw)?;
    if digits.is_empty() {
        return Err(AbiError::EmptyReturn);
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AbiError::InvalidHex(raw.to_string()));
    }
    let word = &digits[..digits.len().min(WORD_HEX_LEN)];
    BigInt::parse_bytes(word.as_bytes(), 16).ok_or_else(|| AbiError::InvalidHex(raw.to_string()))
}

/// Parses a JSON-RPC quantity such as `"0x1b4"`.
pub fn parse_quantity(raw: &str) -> Result<u64, AbiError> {
    let digits = strip_hex_prefix(raw)?;
    if digits.is_empty() {
        return Err(AbiError::InvalidHex(raw.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| AbiError::InvalidHex(raw.to_string()))
}

fn strip_hex_prefix(raw: &str) -> Result<&str, AbiError> {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AbiError::InvalidHex(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: &str) -> AccountAddress {
        AccountAddress::parse(&format!("0x{}", byte.repeat(20))).expect("address")
    }

    #[test]
    fn balance_of_pads_owner_to_one_word() {
        let call = balance_of_call(&addr("ab"));
        assert_eq!(call.len(), 2 + 8 + 64);
        assert!(call.starts_with("0x70a08231000000000000000000000000abab"));
    }

    #[test]
    fn transfer_encodes_recipient_and_amount_words() {
        let call = transfer_call(&addr("01"), &BigInt::from(10_000_000_000_000_000u64))
            .expect("call");
        assert_eq!(call.len(), 2 + 8 + 64 * 2);
        assert!(call.ends_with(&format!("{:0>64}", "2386f26fc10000")));
    }

    #[test]
    fn transfer_rejects_negative_and_oversized_amounts() {
        assert!(transfer_call(&addr("01"), &BigInt::from(-1)).is_err());
        let too_big = BigInt::from(1u8) << 256;
        assert!(matches!(
            transfer_call(&addr("01"), &too_big),
            Err(AbiError::OutOfRange(_))
        ));
    }

    #[test]
    fn decodes_return_words() {
        let word = format!("0x{:0>64}", "de0b6b3a7640000");
        assert_eq!(
            decode_uint(&word).expect("uint").to_string(),
            "1000000000000000000"
        );
        assert_eq!(decode_uint("0x12").expect("short").to_string(), "18");
        assert_eq!(decode_uint("0x"), Err(AbiError::EmptyReturn));
        assert!(matches!(decode_uint("12"), Err(AbiError::InvalidHex(_))));
    }

    #[test]
    fn non_hex_return_data_is_an_error() {
        let multibyte = format!("0x{}é", "a".repeat(63));
        assert!(matches!(decode_uint(&multibyte), Err(AbiError::InvalidHex(_))));
        assert!(matches!(decode_uint("0xzz"), Err(AbiError::InvalidHex(_))));
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("0x1b4").expect("qty"), 436);
        assert!(parse_quantity("0x").is_err());
    }
}
