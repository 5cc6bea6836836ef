//! Binary container codec for SDT values
//!
//! Wire layout: every value is a one-byte type tag followed by its payload.
//! Strings and byte arrays carry a u32 big-endian length prefix; lists and
//! maps carry a u32 element count, map entries being a length-prefixed UTF-8
//! key followed by the entry value.
//!
//! The container format supports exactly one level of container nesting: a
//! list or map may hold scalars and containers-of-scalars, nothing deeper.
//! `encode` rejects deeper trees up front instead of writing a container the
//! broker cannot represent.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use crate::error::{BusError, BusResult};
use crate::sdt::Value;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;
const TAG_LIST: u8 = 0x06;
const TAG_MAP: u8 = 0x07;

// Container nesting supported by the wire format: a top-level container and
// one nested container whose elements are all scalars.
const MAX_CONTAINER_DEPTH: u8 = 1;

/// Encode a value tree into its binary container form.
///
/// Fails with [`BusError::Serialization`] when the tree nests containers
/// deeper than the format supports.
pub fn encode(value: &Value) -> BusResult<Bytes> {
    let mut buf = BytesMut::with_capacity(64);
    encode_value(value, 0, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode a binary container back into a value tree.
///
/// Fails with [`BusError::Serialization`] on truncated or malformed input;
/// never fails on the output of [`encode`]. Trailing bytes after the root
/// value are malformed input.
pub fn decode(data: &[u8]) -> BusResult<Value> {
    let mut src = Cursor::new(data);
    let value = decode_value(&mut src, 0)?;
    if src.has_remaining() {
        return Err(BusError::serialization(format!(
            "{} trailing bytes after value",
            src.remaining()
        )));
    }
    Ok(value)
}

/// Serialize a value to bytes. Entry point mirroring the client API surface.
pub fn dumps(value: &Value) -> BusResult<Bytes> {
    encode(value)
}

/// Deserialize bytes to a value. Entry point mirroring the client API surface.
pub fn loads(data: &[u8]) -> BusResult<Value> {
    decode(data)
}

fn encode_value(value: &Value, depth: u8, buf: &mut BytesMut) -> BusResult<()> {
    match value {
        Value::Null => buf.put_u8(TAG_NULL),
        Value::Bool(b) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(*b as u8);
        }
        Value::Int(i) => {
            buf.put_u8(TAG_INT);
            buf.put_i64(*i);
        }
        Value::Float(f) => {
            buf.put_u8(TAG_FLOAT);
            buf.put_f64(*f);
        }
        Value::Str(s) => {
            buf.put_u8(TAG_STR);
            put_len_prefixed(buf, s.as_bytes())?;
        }
        Value::Bytes(b) => {
            buf.put_u8(TAG_BYTES);
            put_len_prefixed(buf, b)?;
        }
        Value::List(items) => {
            ensure_container_depth(depth)?;
            buf.put_u8(TAG_LIST);
            buf.put_u32(count_prefix(items.len())?);
            for item in items {
                encode_value(item, depth + 1, buf)?;
            }
        }
        Value::Map(entries) => {
            ensure_container_depth(depth)?;
            buf.put_u8(TAG_MAP);
            buf.put_u32(count_prefix(entries.len())?);
            let mut seen: Vec<&str> = Vec::with_capacity(entries.len());
            for (key, entry) in entries {
                // Decode rejects duplicate keys, so never emit them.
                if seen.contains(&key.as_str()) {
                    return Err(BusError::serialization(format!(
                        "duplicate map key '{key}'"
                    )));
                }
                seen.push(key);
                put_len_prefixed(buf, key.as_bytes())?;
                encode_value(entry, depth + 1, buf)?;
            }
        }
    }
    Ok(())
}

fn ensure_container_depth(depth: u8) -> BusResult<()> {
    if depth > MAX_CONTAINER_DEPTH {
        return Err(BusError::serialization(
            "container nesting deeper than one level is not supported by the wire format",
        ));
    }
    Ok(())
}

fn count_prefix(len: usize) -> BusResult<u32> {
    u32::try_from(len).map_err(|_| BusError::serialization("container count exceeds u32 prefix"))
}

fn put_len_prefixed(buf: &mut BytesMut, data: &[u8]) -> BusResult<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| BusError::serialization("field exceeds u32 length prefix"))?;
    buf.put_u32(len);
    buf.put_slice(data);
    Ok(())
}

fn decode_value(src: &mut Cursor<&[u8]>, depth: u8) -> BusResult<Value> {
    let tag = read_u8(src)?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOL => match read_u8(src)? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(BusError::serialization(format!(
                "invalid boolean byte 0x{other:02x}"
            ))),
        },
        TAG_INT => {
            ensure_remaining(src, 8)?;
            Ok(Value::Int(src.get_i64()))
        }
        TAG_FLOAT => {
            ensure_remaining(src, 8)?;
            Ok(Value::Float(src.get_f64()))
        }
        TAG_STR => {
            let raw = read_len_prefixed(src)?;
            let s = String::from_utf8(raw)
                .map_err(|e| BusError::serialization(format!("invalid UTF-8 string: {e}")))?;
            Ok(Value::Str(s))
        }
        TAG_BYTES => Ok(Value::Bytes(read_len_prefixed(src)?)),
        TAG_LIST => {
            ensure_container_depth(depth)
                .map_err(|_| BusError::serialization("list nested deeper than supported"))?;
            let count = read_u32(src)?;
            let mut items = Vec::with_capacity(bounded_capacity(count, src));
            for _ in 0..count {
                items.push(decode_value(src, depth + 1)?);
            }
            Ok(Value::List(items))
        }
        TAG_MAP => {
            ensure_container_depth(depth)
                .map_err(|_| BusError::serialization("map nested deeper than supported"))?;
            let count = read_u32(src)?;
            let mut entries: Vec<(String, Value)> = Vec::with_capacity(bounded_capacity(count, src));
            for _ in 0..count {
                let raw_key = read_len_prefixed(src)?;
                let key = String::from_utf8(raw_key)
                    .map_err(|e| BusError::serialization(format!("invalid UTF-8 map key: {e}")))?;
                if entries.iter().any(|(k, _)| *k == key) {
                    return Err(BusError::serialization(format!(
                        "duplicate map key '{key}'"
                    )));
                }
                let value = decode_value(src, depth + 1)?;
                entries.push((key, value));
            }
            Ok(Value::Map(entries))
        }
        other => Err(BusError::serialization(format!(
            "unknown type tag 0x{other:02x}"
        ))),
    }
}

// Cap pre-allocation by what the input could possibly hold, so a corrupt
// count cannot trigger an oversized allocation before the truncation check.
fn bounded_capacity(count: u32, src: &Cursor<&[u8]>) -> usize {
    (count as usize).min(src.remaining())
}

fn read_u8(src: &mut Cursor<&[u8]>) -> BusResult<u8> {
    ensure_remaining(src, 1)?;
    Ok(src.get_u8())
}

fn read_u32(src: &mut Cursor<&[u8]>) -> BusResult<u32> {
    ensure_remaining(src, 4)?;
    Ok(src.get_u32())
}

fn read_len_prefixed(src: &mut Cursor<&[u8]>) -> BusResult<Vec<u8>> {
    let len = read_u32(src)? as usize;
    ensure_remaining(src, len)?;
    let mut out = vec![0u8; len];
    src.copy_to_slice(&mut out);
    Ok(out)
}

fn ensure_remaining(src: &Cursor<&[u8]>, needed: usize) -> BusResult<()> {
    if src.remaining() < needed {
        return Err(BusError::serialization(format!(
            "truncated input: needed {needed} more bytes, {} available",
            src.remaining()
        )));
    }
    Ok(())
}
