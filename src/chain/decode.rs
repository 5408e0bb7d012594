//! Lenient reshaping of dynamic SCALE values into SDK models.
//!
//! Storage and event data arrive as `scale_value::Value`s whose exact shape
//! depends on the runtime version. Helpers here look fields up by name, unwrap
//! newtype wrappers, and accept the field spellings used by older runtimes.

use subxt::ext::scale_value::{Composite, Primitive, Value, ValueDef};

use crate::chain::types::{AccountData, ChainError, ChainResult};

/// Engine identifier of BABE pre-runtime digests.
pub const BABE_ENGINE_ID: [u8; 4] = *b"BABE";

/// Engine identifier of Aura pre-runtime digests.
pub const AURA_ENGINE_ID: [u8; 4] = *b"aura";

/// Look up the first present named field among `names`.
pub fn field<'a, T>(value: &'a Value<T>, names: &[&str]) -> Option<&'a Value<T>> {
    let fields = match &value.value {
        ValueDef::Composite(Composite::Named(fields)) => fields,
        ValueDef::Variant(variant) => match &variant.values {
            Composite::Named(fields) => fields,
            Composite::Unnamed(_) => return None,
        },
        _ => return None,
    };

    names
        .iter()
        .find_map(|name| fields.iter().find(|(n, _)| n == name).map(|(_, v)| v))
}

/// Unwrap single-field composites such as `Perbill(u32)` or `Compact<T>`.
fn unwrap_newtype<T>(value: &Value<T>) -> &Value<T> {
    match &value.value {
        ValueDef::Composite(Composite::Unnamed(values)) if values.len() == 1 => {
            unwrap_newtype(&values[0])
        }
        ValueDef::Composite(Composite::Named(fields)) if fields.len() == 1 => {
            unwrap_newtype(&fields[0].1)
        }
        _ => value,
    }
}

pub fn as_u128<T>(value: &Value<T>) -> Option<u128> {
    match &unwrap_newtype(value).value {
        ValueDef::Primitive(Primitive::U128(n)) => Some(*n),
        ValueDef::Primitive(Primitive::I128(n)) => u128::try_from(*n).ok(),
        ValueDef::Primitive(Primitive::String(s)) => s.parse().ok(),
        _ => None,
    }
}

pub fn as_u64<T>(value: &Value<T>) -> Option<u64> {
    as_u128(value).and_then(|n| u64::try_from(n).ok())
}

pub fn as_bool<T>(value: &Value<T>) -> Option<bool> {
    match &unwrap_newtype(value).value {
        ValueDef::Primitive(Primitive::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Byte sequences decode as composites of `u8` primitives, possibly nested in
/// newtype wrappers (`AccountId32([u8; 32])`, `BoundedVec<u8>`).
pub fn as_bytes<T>(value: &Value<T>) -> Option<Vec<u8>> {
    let values = match &unwrap_newtype(value).value {
        ValueDef::Composite(Composite::Unnamed(values)) => values,
        ValueDef::Primitive(Primitive::U256(bytes)) => return Some(bytes.to_vec()),
        _ => return None,
    };

    values
        .iter()
        .map(|v| match &v.value {
            ValueDef::Primitive(Primitive::U128(n)) => u8::try_from(*n).ok(),
            _ => None,
        })
        .collect()
}

/// A 32-byte account id, also accepting `MultiAddress::Id(..)`.
pub fn as_account<T>(value: &Value<T>) -> Option<[u8; 32]> {
    if let ValueDef::Variant(variant) = &value.value {
        if variant.name == "Id" {
            return variant.values.values().next().and_then(as_account);
        }
        return None;
    }
    as_bytes(value).and_then(|bytes| bytes.try_into().ok())
}

/// Strings, UTF-8 byte sequences and field-less enum variants.
pub fn as_text<T>(value: &Value<T>) -> Option<String> {
    let inner = unwrap_newtype(value);
    match &inner.value {
        ValueDef::Primitive(Primitive::String(s)) => Some(s.clone()),
        ValueDef::Variant(variant) => Some(variant.name.clone()),
        _ => as_bytes(inner).and_then(|bytes| String::from_utf8(bytes).ok()),
    }
}

/// Identifier text of a key or id value: `0x`-hex for byte strings, decimal
/// for numbers, tuple parts joined with `/`.
pub fn id_text<T>(value: &Value<T>) -> Option<String> {
    if let Some(bytes) = as_bytes(value).filter(|b| !b.is_empty()) {
        return Some(format!("0x{}", hex::encode(bytes)));
    }
    if let Some(n) = as_u128(value) {
        return Some(n.to_string());
    }
    match &unwrap_newtype(value).value {
        ValueDef::Composite(Composite::Unnamed(parts)) if !parts.is_empty() => join_ids(parts),
        _ => None,
    }
}

/// Identifier text of a decoded storage key, one part per hasher.
pub fn join_ids<T>(parts: &[Value<T>]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    let texts = parts.iter().map(id_text).collect::<Option<Vec<_>>>()?;
    Some(texts.join("/"))
}

/// Call argument for an identifier produced by [`id_text`].
///
/// Decimal parts are numbers; anything else is hex, with or without `0x`.
pub fn id_value(id: &str) -> ChainResult<Value> {
    let mut parts = id
        .trim()
        .split('/')
        .map(|part| id_part_value(id, part.trim()))
        .collect::<ChainResult<Vec<_>>>()?;
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Value::unnamed_composite(parts))
}

fn id_part_value(id: &str, part: &str) -> ChainResult<Value> {
    let invalid = |reason: String| ChainError::Decode(format!("invalid identifier '{}': {}", id, reason));

    if part.is_empty() || part == "0x" {
        return Err(invalid("empty part".to_string()));
    }
    if let Some(hex_part) = part.strip_prefix("0x") {
        return hex::decode(hex_part)
            .map(Value::from_bytes)
            .map_err(|e| invalid(e.to_string()));
    }
    if part.bytes().all(|b| b.is_ascii_digit()) {
        return part
            .parse::<u128>()
            .map(Value::u128)
            .map_err(|e| invalid(e.to_string()));
    }
    hex::decode(part)
        .map(Value::from_bytes)
        .map_err(|e| invalid(e.to_string()))
}

/// Named numeric field, zero when absent.
pub fn u128_field_or_zero<T>(value: &Value<T>, names: &[&str]) -> u128 {
    field(value, names).and_then(as_u128).unwrap_or(0)
}

/// Named numeric field that must be present.
pub fn require_u128<T>(value: &Value<T>, names: &[&str]) -> ChainResult<u128> {
    field(value, names)
        .and_then(as_u128)
        .ok_or_else(|| ChainError::Decode(format!("missing numeric field {}", names.join("|"))))
}

/// Named account field that must be present.
pub fn require_account<T>(value: &Value<T>, names: &[&str]) -> ChainResult<[u8; 32]> {
    field(value, names)
        .and_then(as_account)
        .ok_or_else(|| ChainError::Decode(format!("missing account field {}", names.join("|"))))
}

/// Decode a `System.Account` value.
pub fn account_data<T>(value: &Value<T>) -> ChainResult<AccountData> {
    let nonce = field(value, &["nonce"]).and_then(as_u64).unwrap_or(0);
    let data = field(value, &["data"])
        .ok_or_else(|| ChainError::Decode("account info has no data field".to_string()))?;

    let free = require_u128(data, &["free"])?;
    let reserved = u128_field_or_zero(data, &["reserved"]);
    let locked = match field(data, &["frozen"]).and_then(as_u128) {
        Some(frozen) => frozen,
        None => u128_field_or_zero(data, &["misc_frozen"])
            .saturating_add(u128_field_or_zero(data, &["fee_frozen"])),
    };

    Ok(AccountData {
        nonce,
        free,
        reserved,
        locked,
    })
}

/// Where a block author can be found, taken from a pre-runtime digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorHint {
    /// Index into the authority set.
    Index(u32),
    /// Slot number; the author is `authorities[slot % len]`.
    Slot(u64),
}

impl AuthorHint {
    /// Resolve against the current authority set.
    pub fn resolve<'a, A>(&self, authorities: &'a [A]) -> Option<&'a A> {
        if authorities.is_empty() {
            return None;
        }
        match *self {
            AuthorHint::Index(i) => authorities.get(i as usize),
            AuthorHint::Slot(slot) => authorities.get((slot % authorities.len() as u64) as usize),
        }
    }
}

/// Extract an author hint from the pre-runtime digests of a header.
///
/// BABE digests start with a variant byte (1 primary, 2 secondary plain,
/// 3 secondary VRF) followed by a little-endian `u32` authority index. Aura
/// digests hold a little-endian `u64` slot.
pub fn author_hint(pre_runtime: &[([u8; 4], Vec<u8>)]) -> Option<AuthorHint> {
    pre_runtime.iter().find_map(|(engine, data)| {
        if *engine == BABE_ENGINE_ID && data.len() >= 5 && (1..=3).contains(&data[0]) {
            let index = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
            Some(AuthorHint::Index(index))
        } else if *engine == AURA_ENGINE_ID && data.len() >= 8 {
            let mut slot = [0u8; 8];
            slot.copy_from_slice(&data[..8]);
            Some(AuthorHint::Slot(u64::from_le_bytes(slot)))
        } else {
            None
        }
    })
}
