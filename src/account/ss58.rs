//! SS58 address encoding.
//!
//! `base58(prefix ++ public_key ++ checksum)` where the checksum is the first
//! two bytes of `blake2b_512("SS58PRE" ++ prefix ++ public_key)`.

use blake2::{Blake2b512, Digest};

use crate::chain::types::{ChainError, ChainResult};

/// Generic Substrate network prefix, used by Creditcoin.
pub const DEFAULT_SS58_FORMAT: u16 = 42;

/// Largest prefix representable by the two-byte encoding.
pub const MAX_SS58_FORMAT: u16 = 16_383;

const CHECKSUM_PREAMBLE: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
const PUBLIC_KEY_LEN: usize = 32;

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(CHECKSUM_PREAMBLE);
    hasher.update(payload);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

fn encode_prefix(format: u16) -> Vec<u8> {
    match format {
        0..=63 => vec![format as u8],
        _ => {
            let first = ((format & 0b0000_0000_1111_1100) as u8) >> 2;
            let second = ((format >> 8) as u8) | (((format & 0b0000_0000_0000_0011) as u8) << 6);
            vec![first | 0b0100_0000, second]
        }
    }
}

/// Encode a 32-byte public key as an SS58 address.
pub fn encode(public_key: &[u8; 32], format: u16) -> ChainResult<String> {
    if format > MAX_SS58_FORMAT {
        return Err(ChainError::Configuration(format!(
            "SS58 format {} exceeds {}",
            format, MAX_SS58_FORMAT
        )));
    }

    let mut payload = encode_prefix(format);
    payload.extend_from_slice(public_key);
    let sum = checksum(&payload);
    payload.extend_from_slice(&sum);

    Ok(bs58::encode(payload).into_string())
}

/// Decode an SS58 address into its network prefix and public key.
pub fn decode(address: &str) -> ChainResult<(u16, [u8; 32])> {
    let invalid = |reason: &str| ChainError::InvalidAddress(format!("{}: {}", address, reason));

    let data = bs58::decode(address)
        .into_vec()
        .map_err(|_| invalid("not base58"))?;

    if data.len() < 2 {
        return Err(invalid("too short"));
    }

    let (prefix_len, format) = match data[0] {
        0..=63 => (1, data[0] as u16),
        64..=127 => {
            let lower = (data[0] << 2) | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            (2, (lower as u16) | ((upper as u16) << 8))
        }
        _ => return Err(invalid("reserved prefix")),
    };

    if data.len() != prefix_len + PUBLIC_KEY_LEN + CHECKSUM_LEN {
        return Err(invalid("unexpected length"));
    }

    let body_len = prefix_len + PUBLIC_KEY_LEN;
    if checksum(&data[..body_len])[..] != data[body_len..] {
        return Err(invalid("bad checksum"));
    }

    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&data[prefix_len..body_len]);
    Ok((format, public_key))
}

/// Decode an address and return only its public key.
pub fn decode_public_key(address: &str) -> ChainResult<[u8; 32]> {
    decode(address).map(|(_, key)| key)
}

/// Whether the string is a well-formed SS58 address (any network prefix).
pub fn is_valid_address(address: &str) -> bool {
    decode(address).is_ok()
}

/// Re-encode an address for a different network prefix.
pub fn reformat(address: &str, format: u16) -> ChainResult<String> {
    let key = decode_public_key(address)?;
    encode(&key, format)
}
