//! bn254 scalar field conversions
//!
//! circuits consume decimal strings, snapshots and contracts use 32-byte
//! big-endian hex. zero doubles as the "absent" sentinel, it is never a
//! valid uid or commitment.

use alloy::primitives::{B256, U256};
use ark_ff::{BigInteger, PrimeField};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::constants::NONCE_BYTES;
use crate::error::FieldParseError;

pub use ark_bn254::Fr;
pub use ark_ff::Zero;

/// field element to 32 big-endian bytes
pub fn field_to_bytes(value: &Fr) -> [u8; 32] {
    let mut out = [0u8; 32];
    let bytes = value.into_bigint().to_bytes_be();
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// big-endian bytes to field element, reduced mod r
pub fn field_from_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

pub fn field_to_b256(value: &Fr) -> B256 {
    B256::from(field_to_bytes(value))
}

pub fn b256_to_field(value: B256) -> Fr {
    field_from_bytes(value.as_slice())
}

/// 64 lowercase hex chars, zero-left-padded, no prefix
pub fn field_to_hex(value: &Fr) -> String {
    hex::encode(field_to_bytes(value))
}

/// base-10 rendering expected by circuit input parsers
pub fn field_to_decimal(value: &Fr) -> String {
    U256::from_be_bytes(field_to_bytes(value)).to_string()
}

/// strict hex parser, accepts an optional `0x` prefix and odd lengths
pub fn parse_hex_field(input: &str) -> Result<Fr, FieldParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(FieldParseError::Empty);
    }
    if digits.len() > 64 {
        return Err(FieldParseError::TooWide(digits.len()));
    }

    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };

    let bytes =
        hex::decode(&padded).map_err(|_| FieldParseError::InvalidHex(input.to_string()))?;
    Ok(field_from_bytes(&bytes))
}

/// lenient hex parser: malformed or empty input becomes zero
///
/// callers must treat the returned zero as "absent".
pub fn hex_to_field(input: &str) -> Fr {
    match parse_hex_field(input) {
        Ok(value) => value,
        Err(e) => {
            warn!("substituting zero for field input {:?}: {}", input, e);
            Fr::zero()
        }
    }
}

pub fn parse_decimal_field(input: &str) -> Result<Fr, FieldParseError> {
    let digits = input.trim();
    if digits.is_empty() {
        return Err(FieldParseError::Empty);
    }
    let value = U256::from_str_radix(digits, 10)
        .map_err(|_| FieldParseError::InvalidDecimal(input.to_string()))?;
    Ok(field_from_bytes(&value.to_be_bytes::<32>()))
}

/// map an opaque game/player identifier into the field
///
/// decimal strings are taken as integers, `0x` strings as hex, anything
/// else as sha256(utf8) mod r.
pub fn id_to_field(id: &str) -> Fr {
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = parse_decimal_field(id) {
            return value;
        }
    }
    if id.starts_with("0x") {
        if let Ok(value) = parse_hex_field(id) {
            return value;
        }
    }
    let digest = Sha256::digest(id.as_bytes());
    field_from_bytes(&digest)
}

/// uniform bytes reduced mod r
pub fn random_field<R: RngCore + CryptoRng>(rng: &mut R) -> Fr {
    let mut bytes = [0u8; NONCE_BYTES];
    rng.fill_bytes(&mut bytes);
    field_from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_empty_hex_is_zero() {
        assert_eq!(hex_to_field("0x"), Fr::zero());
        assert_eq!(hex_to_field(""), Fr::zero());
        assert_eq!(parse_hex_field("0x"), Err(FieldParseError::Empty));
        assert_eq!(parse_hex_field(""), Err(FieldParseError::Empty));
    }

    #[test]
    fn test_malformed_hex_is_zero() {
        assert_eq!(hex_to_field("0xzz"), Fr::zero());
        assert!(matches!(
            parse_hex_field("0xzz"),
            Err(FieldParseError::InvalidHex(_))
        ));
        let wide = "f".repeat(65);
        assert_eq!(parse_hex_field(&wide), Err(FieldParseError::TooWide(65)));
    }

    #[test]
    fn test_hex_round_trip() {
        let value = Fr::from(0xdead_beef_u64);
        let hex = field_to_hex(&value);
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("0000"));
        assert!(hex.ends_with("deadbeef"));
        assert_eq!(parse_hex_field(&hex).unwrap(), value);
        assert_eq!(parse_hex_field("0xdeadbeef").unwrap(), value);
        assert_eq!(parse_hex_field("abc").unwrap(), Fr::from(0xabc_u64));
    }

    #[test]
    fn test_decimal_encoding() {
        assert_eq!(field_to_decimal(&Fr::zero()), "0");
        assert_eq!(field_to_decimal(&Fr::from(1234567u64)), "1234567");
        assert_eq!(parse_decimal_field("1234567").unwrap(), Fr::from(1234567u64));
        assert!(parse_decimal_field("12a").is_err());
        assert_eq!(parse_decimal_field(""), Err(FieldParseError::Empty));
    }

    #[test]
    fn test_modulus_reduces() {
        // r - 1 survives, r wraps to zero
        let minus_one = -Fr::from(1u64);
        let r_minus_one = field_to_decimal(&minus_one);
        assert_eq!(
            r_minus_one,
            "21888242871839275222246405745257275088548364400416034343698204186575808495616"
        );
        let r = "21888242871839275222246405745257275088548364400416034343698204186575808495617";
        assert_eq!(parse_decimal_field(r).unwrap(), Fr::zero());
    }

    #[test]
    fn test_id_to_field() {
        assert_eq!(id_to_field("42"), Fr::from(42u64));
        assert_eq!(id_to_field("0x2a"), Fr::from(42u64));
        let a = id_to_field("game-abc");
        let b = id_to_field("game-abd");
        assert_ne!(a, b);
        assert_eq!(a, id_to_field("game-abc"));
        assert_ne!(a, Fr::zero());
    }

    #[test]
    fn test_random_field_fresh() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let a = random_field(&mut rng);
        let b = random_field(&mut rng);
        assert_ne!(a, b);
        assert_ne!(a, Fr::zero());
    }

    #[test]
    fn test_b256_conversion() {
        let value = Fr::from(99u64);
        let word = field_to_b256(&value);
        assert_eq!(word.as_slice()[31], 99);
        assert_eq!(b256_to_field(word), value);
    }
}
