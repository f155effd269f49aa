//! Atomic kinds, byte order and the decoded [Value] tree.
//!
//! Multi-byte atoms are stored in the configured [ByteOrder]. Code-point text
//! uses four bytes per unit (UCS-4), byte text one byte per unit; both are
//! NUL-padded and decode with trailing NUL units stripped.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Primitive kind of a scalar atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Opaque 8-byte reference handle; `0` is the null handle.
    Object,
}

impl ScalarKind {
    /// Size in bytes of one value of this kind.
    pub fn size(self) -> usize {
        match self {
            ScalarKind::Bool | ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 | ScalarKind::Object => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Object => "object",
        }
    }

    /// The value every buffer slot of this kind starts with when no default is given.
    pub fn zero(self) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => Value::Int(0),
            ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => {
                Value::UInt(0)
            }
            ScalarKind::F32 | ScalarKind::F64 => Value::Float(0.0),
            ScalarKind::Object => Value::Object(0),
        }
    }

    /// Normalises `value` into the canonical variant for this kind.
    ///
    /// Returns `None` when the value has the wrong variant or does not fit the kind's range.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ScalarKind::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (ScalarKind::Object, Value::Object(handle)) => Some(Value::Object(*handle)),
            (ScalarKind::F32, _) => as_f64(value).map(|v| Value::Float(v as f32 as f64)),
            (ScalarKind::F64, _) => as_f64(value).map(Value::Float),
            (kind, _) if kind.is_signed() => {
                let v = match value {
                    Value::Int(v) => *v,
                    Value::UInt(v) => i64::try_from(*v).ok()?,
                    _ => return None,
                };
                let bits = kind.size() * 8;
                let min = i64::MIN >> (64 - bits);
                let max = i64::MAX >> (64 - bits);
                (min..=max).contains(&v).then_some(Value::Int(v))
            }
            (kind, _) if kind.is_unsigned() => {
                let v = match value {
                    Value::UInt(v) => *v,
                    Value::Int(v) => u64::try_from(*v).ok()?,
                    _ => return None,
                };
                let max = u64::MAX >> (64 - kind.size() * 8);
                (v <= max).then_some(Value::UInt(v))
            }
            _ => None,
        }
    }

    fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64
        )
    }

    fn is_unsigned(self) -> bool {
        matches!(
            self,
            ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64
        )
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v),
        Value::Int(v) => Some(*v as f64),
        Value::UInt(v) => Some(*v as f64),
        _ => None,
    }
}

/// How text units are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextEncoding {
    /// One byte per unit; decodes to [Value::Bytes].
    Bytes,
    /// One 4-byte code point per unit; decodes to [Value::Str].
    CodePoints,
}

impl TextEncoding {
    pub fn unit_size(self) -> usize {
        match self {
            TextEncoding::Bytes => 1,
            TextEncoding::CodePoints => 4,
        }
    }

    pub fn empty(self) -> Value {
        match self {
            TextEncoding::Bytes => Value::Bytes(Vec::new()),
            TextEncoding::CodePoints => Value::Str(String::new()),
        }
    }

    /// Normalises a text value, truncating it to `length` units.
    ///
    /// Trailing NUL units are dropped, as decoding drops them.
    pub fn coerce(self, value: &Value, length: usize) -> Option<Value> {
        match (self, value) {
            (TextEncoding::Bytes, Value::Bytes(bytes)) => Some(trim_bytes(bytes, length)),
            (TextEncoding::Bytes, Value::Str(s)) if s.is_ascii() => {
                Some(trim_bytes(s.as_bytes(), length))
            }
            (TextEncoding::CodePoints, Value::Str(s)) => {
                let mut s: String = s.chars().take(length).collect();
                s.truncate(s.trim_end_matches('\0').len());
                Some(Value::Str(s))
            }
            _ => None,
        }
    }
}

fn trim_bytes(bytes: &[u8], length: usize) -> Value {
    let bytes = &bytes[..bytes.len().min(length)];
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    Value::Bytes(bytes[..end].to_vec())
}

/// Byte order of multi-byte atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Writes little-endian `bytes` into `out` in this order.
    fn put<const N: usize>(self, out: &mut [u8], bytes: [u8; N]) {
        out[..N].copy_from_slice(&bytes);
        if self == ByteOrder::Big {
            out[..N].reverse();
        }
    }

    /// Reads `N` bytes from `data` and returns them little-endian.
    fn take<const N: usize>(self, data: &[u8]) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&data[..N]);
        if self == ByteOrder::Big {
            bytes.reverse();
        }

        bytes
    }
}

/// A decoded value: a single atom, or an array/record of values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Object(u64),
    Bytes(Vec<u8>),
    Str(String),
    Array(Vec<Value>),
    /// Field name/value pairs in declaration order.
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Short description of the variant, used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::UInt(_) => "uint".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Object(_) => "object".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Array(items) => format!("array of {}", items.len()),
            Value::Record(fields) => format!("record of {}", fields.len()),
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Object(handle) => write!(f, "object({handle:#x})"),
            Value::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::Int(value.into())
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::UInt(value.into())
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::UInt(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::UInt(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// Decodes one scalar of `kind` from the start of `data`.
pub(crate) fn read_scalar(kind: ScalarKind, order: ByteOrder, data: &[u8]) -> Value {
    match kind {
        ScalarKind::Bool => Value::Bool(data[0] != 0),
        ScalarKind::I8 => Value::Int(data[0] as i8 as i64),
        ScalarKind::I16 => Value::Int(i16::from_le_bytes(order.take(data)).into()),
        ScalarKind::I32 => Value::Int(i32::from_le_bytes(order.take(data)).into()),
        ScalarKind::I64 => Value::Int(i64::from_le_bytes(order.take(data))),
        ScalarKind::U8 => Value::UInt(data[0].into()),
        ScalarKind::U16 => Value::UInt(u16::from_le_bytes(order.take(data)).into()),
        ScalarKind::U32 => Value::UInt(u32::from_le_bytes(order.take(data)).into()),
        ScalarKind::U64 => Value::UInt(u64::from_le_bytes(order.take(data))),
        ScalarKind::F32 => Value::Float(f32::from_le_bytes(order.take(data)).into()),
        ScalarKind::F64 => Value::Float(f64::from_le_bytes(order.take(data))),
        ScalarKind::Object => Value::Object(u64::from_le_bytes(order.take(data))),
    }
}

/// Encodes a value already normalised by [ScalarKind::coerce].
pub(crate) fn write_scalar(kind: ScalarKind, order: ByteOrder, value: &Value, out: &mut [u8]) {
    match (kind, value) {
        (ScalarKind::Bool, Value::Bool(v)) => out[0] = u8::from(*v),
        (ScalarKind::I8, Value::Int(v)) => out[0] = *v as i8 as u8,
        (ScalarKind::I16, Value::Int(v)) => order.put(out, (*v as i16).to_le_bytes()),
        (ScalarKind::I32, Value::Int(v)) => order.put(out, (*v as i32).to_le_bytes()),
        (ScalarKind::I64, Value::Int(v)) => order.put(out, v.to_le_bytes()),
        (ScalarKind::U8, Value::UInt(v)) => out[0] = *v as u8,
        (ScalarKind::U16, Value::UInt(v)) => order.put(out, (*v as u16).to_le_bytes()),
        (ScalarKind::U32, Value::UInt(v)) => order.put(out, (*v as u32).to_le_bytes()),
        (ScalarKind::U64, Value::UInt(v)) => order.put(out, v.to_le_bytes()),
        (ScalarKind::F32, Value::Float(v)) => order.put(out, (*v as f32).to_le_bytes()),
        (ScalarKind::F64, Value::Float(v)) => order.put(out, v.to_le_bytes()),
        (ScalarKind::Object, Value::Object(v)) => order.put(out, v.to_le_bytes()),
        _ => {}
    }
}

/// Decodes `length` text units from the start of `data`, stripping trailing NULs.
pub(crate) fn read_text(
    encoding: TextEncoding,
    order: ByteOrder,
    length: usize,
    data: &[u8],
) -> Value {
    match encoding {
        TextEncoding::Bytes => {
            let bytes = &data[..length];
            let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            Value::Bytes(bytes[..end].to_vec())
        }
        TextEncoding::CodePoints => {
            let units: Vec<u32> = data[..length * 4]
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes(order.take(chunk)))
                .collect();
            let end = units.iter().rposition(|u| *u != 0).map_or(0, |i| i + 1);
            Value::Str(
                units[..end]
                    .iter()
                    .map(|u| char::from_u32(*u).unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect(),
            )
        }
    }
}

/// Encodes a value already normalised by [TextEncoding::coerce], NUL-padding to `length` units.
pub(crate) fn write_text(
    encoding: TextEncoding,
    order: ByteOrder,
    length: usize,
    value: &Value,
    out: &mut [u8],
) {
    let out = &mut out[..length * encoding.unit_size()];
    out.fill(0);
    match value {
        Value::Bytes(bytes) => out[..bytes.len()].copy_from_slice(bytes),
        Value::Str(s) => {
            for (chunk, c) in out.chunks_exact_mut(4).zip(s.chars()) {
                order.put(chunk, u32::from(c).to_le_bytes());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_signed_range() {
        assert_eq!(ScalarKind::I8.coerce(&Value::Int(-128)), Some(Value::Int(-128)));
        assert_eq!(ScalarKind::I8.coerce(&Value::Int(128)), None);
        assert_eq!(ScalarKind::I16.coerce(&Value::UInt(300)), Some(Value::Int(300)));
        assert_eq!(ScalarKind::I64.coerce(&Value::UInt(u64::MAX)), None);
    }

    #[test]
    fn test_coerce_unsigned_range() {
        assert_eq!(ScalarKind::U8.coerce(&Value::Int(255)), Some(Value::UInt(255)));
        assert_eq!(ScalarKind::U8.coerce(&Value::Int(256)), None);
        assert_eq!(ScalarKind::U32.coerce(&Value::Int(-1)), None);
        assert_eq!(ScalarKind::U64.coerce(&Value::UInt(u64::MAX)), Some(Value::UInt(u64::MAX)));
    }

    #[test]
    fn test_coerce_float_precision() {
        assert_eq!(
            ScalarKind::F32.coerce(&Value::Float(0.1)),
            Some(Value::Float(0.1f32 as f64))
        );
        assert_eq!(ScalarKind::F64.coerce(&Value::Int(3)), Some(Value::Float(3.0)));
        assert_eq!(ScalarKind::F64.coerce(&Value::Bool(true)), None);
    }

    #[test]
    fn test_coerce_wrong_variant() {
        assert_eq!(ScalarKind::Bool.coerce(&Value::Int(1)), None);
        assert_eq!(ScalarKind::Object.coerce(&Value::UInt(1)), None);
        assert_eq!(ScalarKind::Object.coerce(&Value::Object(7)), Some(Value::Object(7)));
    }

    #[test]
    fn test_scalar_byte_order() {
        let mut little = [0u8; 4];
        let mut big = [0u8; 4];
        write_scalar(ScalarKind::U32, ByteOrder::Little, &Value::UInt(0x01020304), &mut little);
        write_scalar(ScalarKind::U32, ByteOrder::Big, &Value::UInt(0x01020304), &mut big);

        assert_eq!(little, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(big, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            read_scalar(ScalarKind::U32, ByteOrder::Big, &big),
            Value::UInt(0x01020304)
        );
    }

    #[test]
    fn test_signed_scalar_read() {
        let data = [0xff, 0xff];
        assert_eq!(read_scalar(ScalarKind::I16, ByteOrder::Little, &data), Value::Int(-1));
        assert_eq!(read_scalar(ScalarKind::I8, ByteOrder::Little, &data), Value::Int(-1));
    }

    #[test]
    fn test_text_strips_trailing_nul() {
        let data = *b"ab\0\0";
        assert_eq!(
            read_text(TextEncoding::Bytes, ByteOrder::Little, 4, &data),
            Value::Bytes(b"ab".to_vec())
        );
    }

    #[test]
    fn test_code_point_text() {
        let mut out = [0xaau8; 12];
        write_text(
            TextEncoding::CodePoints,
            ByteOrder::Little,
            3,
            &Value::Str("é€".to_string()),
            &mut out,
        );
        assert_eq!(&out[8..], &[0, 0, 0, 0]);
        assert_eq!(
            read_text(TextEncoding::CodePoints, ByteOrder::Little, 3, &out),
            Value::Str("é€".to_string())
        );
    }

    #[test]
    fn test_text_truncation() {
        assert_eq!(
            TextEncoding::Bytes.coerce(&Value::Bytes(b"hello".to_vec()), 3),
            Some(Value::Bytes(b"hel".to_vec()))
        );
        assert_eq!(
            TextEncoding::CodePoints.coerce(&Value::Str("héllo".to_string()), 2),
            Some(Value::Str("hé".to_string()))
        );
        assert_eq!(TextEncoding::CodePoints.coerce(&Value::Bytes(vec![1]), 2), None);
    }

    #[test]
    fn test_text_coerce_drops_trailing_nul() {
        assert_eq!(
            TextEncoding::Bytes.coerce(&Value::Bytes(b"a\0".to_vec()), 3),
            Some(Value::Bytes(b"a".to_vec()))
        );
        assert_eq!(
            TextEncoding::Bytes.coerce(&Value::Bytes(b"a\0b\0".to_vec()), 3),
            Some(Value::Bytes(b"a".to_vec()))
        );
        assert_eq!(
            TextEncoding::Bytes.coerce(&Value::Bytes(b"\0b".to_vec()), 3),
            Some(Value::Bytes(b"\0b".to_vec()))
        );
        assert_eq!(
            TextEncoding::CodePoints.coerce(&Value::Str("x\0\0".to_string()), 4),
            Some(Value::Str("x".to_string()))
        );
    }

    #[test]
    fn test_display() {
        let value = Value::Record(vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Array(vec![Value::Float(0.5), Value::Float(2.0)])),
            ("c".to_string(), Value::Bytes(b"hi".to_vec())),
        ]);
        assert_eq!(value.to_string(), "(a=1, b=[0.5, 2.0], c=b\"hi\")");
    }
}
