//! Concrete binary layouts produced by the resolver.

use std::fmt;

use crate::{
    descriptor::Shape,
    errors::UsageError,
    value::{self, ByteOrder, ScalarKind, TextEncoding, Value},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Scalar(ScalarKind),
    Text {
        length: usize,
        encoding: TextEncoding,
    },
}

impl AtomKind {
    /// Size of the units the byte order applies to.
    pub fn unit_size(&self) -> usize {
        match self {
            AtomKind::Scalar(kind) => kind.size(),
            AtomKind::Text { encoding, .. } => encoding.unit_size(),
        }
    }
}

/// A terminal layout: one scalar or one fixed-length text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub kind: AtomKind,
    pub order: ByteOrder,
}

impl Atom {
    /// An atom of `kind` in `order`.
    ///
    /// Atoms without multi-byte units are always [ByteOrder::Little], so they
    /// compare equal whatever order they were resolved with.
    pub fn new(kind: AtomKind, order: ByteOrder) -> Self {
        let order = if kind.unit_size() > 1 {
            order
        } else {
            ByteOrder::Little
        };
        Atom { kind, order }
    }

    pub fn size(&self) -> usize {
        match self.kind {
            AtomKind::Scalar(kind) => kind.size(),
            AtomKind::Text { length, encoding } => length * encoding.unit_size(),
        }
    }

    /// Normalises `value` for this atom, or `None` if it does not fit.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match self.kind {
            AtomKind::Scalar(kind) => kind.coerce(value),
            AtomKind::Text { length, encoding } => encoding.coerce(value, length),
        }
    }

    fn decode(&self, data: &[u8]) -> Value {
        match self.kind {
            AtomKind::Scalar(kind) => value::read_scalar(kind, self.order, data),
            AtomKind::Text { length, encoding } => {
                value::read_text(encoding, self.order, length, data)
            }
        }
    }

    fn write(&self, value: &Value, out: &mut [u8]) {
        match self.kind {
            AtomKind::Scalar(kind) => value::write_scalar(kind, self.order, value, out),
            AtomKind::Text { length, encoding } => {
                value::write_text(encoding, self.order, length, value, out)
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AtomKind::Scalar(kind) => write!(f, "{}", kind.name())?,
            AtomKind::Text {
                length,
                encoding: TextEncoding::Bytes,
            } => write!(f, "bytes[{length}]")?,
            AtomKind::Text {
                length,
                encoding: TextEncoding::CodePoints,
            } => write!(f, "str[{length}]")?,
        }

        if self.order == ByteOrder::Big && self.kind.unit_size() > 1 {
            write!(f, "be")?;
        }

        Ok(())
    }
}

/// A field of a structure layout, at `offset` bytes from the start of the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    pub name: String,
    pub offset: usize,
    pub layout: Layout,
}

/// A resolved, fully sized binary layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Layout {
    Atom(Atom),
    /// `element` repeated `shape.count()` times with a stride of `element.size()`.
    Array {
        element: Box<Layout>,
        shape: Shape,
        size: usize,
    },
    /// Fields packed contiguously in declaration order.
    Structure {
        fields: Vec<FieldLayout>,
        size: usize,
    },
}

impl Layout {
    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Layout::Atom(atom) => atom.size(),
            Layout::Array { size, .. } | Layout::Structure { size, .. } => *size,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        match self {
            Layout::Structure { fields, .. } => fields.iter().find(|field| field.name == name),
            _ => None,
        }
    }

    /// Decodes the first `self.size()` bytes of `data`.
    pub fn decode(&self, data: &[u8]) -> Value {
        match self {
            Layout::Atom(atom) => atom.decode(data),
            Layout::Array { element, size, .. } => {
                let stride = element.size();
                Value::Array(
                    data[..*size]
                        .chunks_exact(stride)
                        .map(|chunk| element.decode(chunk))
                        .collect(),
                )
            }
            Layout::Structure { fields, .. } => Value::Record(
                fields
                    .iter()
                    .map(|field| {
                        (
                            field.name.clone(),
                            field.layout.decode(&data[field.offset..]),
                        )
                    })
                    .collect(),
            ),
        }
    }

    /// Encodes `value` into `out`.
    ///
    /// The whole value is checked first; on mismatch nothing is written.
    pub fn encode(&self, value: &Value, out: &mut [u8]) -> Result<(), UsageError> {
        let normalized = self.normalize(value)?;
        self.write(&normalized, out);
        Ok(())
    }

    /// Checks `value` against this layout and returns its canonical form.
    ///
    /// Arrays accept either a flat sequence of `shape.count()` elements or
    /// sequences nested along the shape's dimensions.
    pub fn normalize(&self, value: &Value) -> Result<Value, UsageError> {
        match (self, value) {
            (Layout::Atom(atom), _) => atom.coerce(value).ok_or_else(|| self.mismatch(value)),
            (Layout::Array { element, shape, .. }, Value::Array(_)) => {
                let mut flat = Vec::with_capacity(shape.count().unwrap_or(0));
                self.flatten_into(element, shape.dims(), value, &mut flat)?;
                Ok(Value::Array(flat))
            }
            (Layout::Structure { fields, .. }, Value::Record(values)) => {
                if values.len() != fields.len() {
                    return Err(self.mismatch(value));
                }

                let mut normalized = Vec::with_capacity(fields.len());
                for (field, (name, field_value)) in fields.iter().zip(values) {
                    if *name != field.name {
                        return Err(self.mismatch(value));
                    }
                    normalized.push((name.clone(), field.layout.normalize(field_value)?));
                }

                Ok(Value::Record(normalized))
            }
            _ => Err(self.mismatch(value)),
        }
    }

    fn flatten_into(
        &self,
        element: &Layout,
        dims: &[usize],
        value: &Value,
        flat: &mut Vec<Value>,
    ) -> Result<(), UsageError> {
        let Value::Array(items) = value else {
            return Err(self.mismatch(value));
        };

        let count: usize = dims.iter().product();
        let err = if items.len() == count {
            match items
                .iter()
                .map(|item| element.normalize(item))
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(normalized) => {
                    flat.extend(normalized);
                    return Ok(());
                }
                Err(err) => err,
            }
        } else {
            self.mismatch(value)
        };

        // Trailing 1-dimensions make nested values look flat, e.g. `[[1], [2]]` for 2x1.
        match dims {
            [outer, inner @ ..] if !inner.is_empty() && items.len() == *outer => items
                .iter()
                .try_for_each(|item| self.flatten_into(element, inner, item, flat)),
            _ => Err(err),
        }
    }

    pub(crate) fn write(&self, value: &Value, out: &mut [u8]) {
        match (self, value) {
            (Layout::Atom(atom), _) => atom.write(value, out),
            (Layout::Array { element, .. }, Value::Array(items)) => {
                let stride = element.size();
                for (chunk, item) in out.chunks_exact_mut(stride).zip(items) {
                    element.write(item, chunk);
                }
            }
            (Layout::Structure { fields, .. }, Value::Record(values)) => {
                for (field, (_, field_value)) in fields.iter().zip(values) {
                    field.layout.write(field_value, &mut out[field.offset..]);
                }
            }
            _ => {}
        }
    }

    fn mismatch(&self, value: &Value) -> UsageError {
        UsageError::ValueMismatch {
            expected: self.to_string(),
            found: value.kind_name(),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Atom(atom) => write!(f, "{atom}"),
            Layout::Array { element, shape, .. } => write!(f, "[{element}; {shape}]"),
            Layout::Structure { fields, .. } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {} @{}", field.name, field.layout, field.offset)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: ScalarKind) -> Layout {
        Layout::Atom(Atom {
            kind: AtomKind::Scalar(kind),
            order: ByteOrder::Little,
        })
    }

    fn point() -> Layout {
        Layout::Structure {
            fields: vec![
                FieldLayout {
                    name: "x".to_string(),
                    offset: 0,
                    layout: scalar(ScalarKind::I16),
                },
                FieldLayout {
                    name: "y".to_string(),
                    offset: 2,
                    layout: scalar(ScalarKind::U8),
                },
            ],
            size: 3,
        }
    }

    #[test]
    fn test_display() {
        let layout = Layout::Array {
            element: Box::new(point()),
            shape: Shape::from([2, 2]),
            size: 12,
        };
        assert_eq!(layout.to_string(), "[{x: i16 @0, y: u8 @2}; 2x2]");
    }

    #[test]
    fn test_encode_decode_structure() {
        let layout = point();
        let mut out = [0u8; 3];
        let value = Value::Record(vec![
            ("x".to_string(), Value::Int(-2)),
            ("y".to_string(), Value::Int(7)),
        ]);

        layout.encode(&value, &mut out).unwrap();
        assert_eq!(out, [0xfe, 0xff, 7]);
        assert_eq!(
            layout.decode(&out),
            Value::Record(vec![
                ("x".to_string(), Value::Int(-2)),
                ("y".to_string(), Value::UInt(7)),
            ])
        );
    }

    #[test]
    fn test_encode_mismatch_writes_nothing() {
        let layout = point();
        let mut out = [1u8, 2, 3];
        let value = Value::Record(vec![
            ("x".to_string(), Value::Int(5)),
            ("y".to_string(), Value::Int(1000)),
        ]);

        assert!(matches!(
            layout.encode(&value, &mut out),
            Err(UsageError::ValueMismatch { .. })
        ));
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn test_encode_nested_array_value() {
        let layout = Layout::Array {
            element: Box::new(scalar(ScalarKind::U8)),
            shape: Shape::from([2, 3]),
            size: 6,
        };
        let nested = Value::Array(vec![
            Value::Array(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]),
            Value::Array(vec![Value::UInt(4), Value::UInt(5), Value::UInt(6)]),
        ]);
        let mut out = [0u8; 6];

        layout.encode(&nested, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_encode_nested_trailing_unit_dims() {
        let column = Layout::Array {
            element: Box::new(scalar(ScalarKind::U8)),
            shape: Shape::from([2, 1]),
            size: 2,
        };
        let nested = Value::Array(vec![
            Value::Array(vec![Value::UInt(1)]),
            Value::Array(vec![Value::UInt(2)]),
        ]);
        let mut out = [0u8; 2];
        column.encode(&nested, &mut out).unwrap();
        assert_eq!(out, [1, 2]);

        column
            .encode(&Value::Array(vec![Value::UInt(3), Value::UInt(4)]), &mut out)
            .unwrap();
        assert_eq!(out, [3, 4]);

        let single = Layout::Array {
            element: Box::new(scalar(ScalarKind::U8)),
            shape: Shape::from([1, 1]),
            size: 1,
        };
        let mut out = [0u8; 1];
        single
            .encode(
                &Value::Array(vec![Value::Array(vec![Value::UInt(5)])]),
                &mut out,
            )
            .unwrap();
        assert_eq!(out, [5]);
        assert!(matches!(
            single.encode(&Value::Array(vec![Value::Array(vec![Value::UInt(256)])]), &mut out),
            Err(UsageError::ValueMismatch { .. })
        ));
        assert_eq!(out, [5]);
    }

    #[test]
    fn test_array_wrong_length() {
        let layout = Layout::Array {
            element: Box::new(scalar(ScalarKind::U8)),
            shape: Shape::from(3),
            size: 3,
        };
        let mut out = [0u8; 3];
        assert!(
            layout
                .encode(&Value::Array(vec![Value::UInt(1)]), &mut out)
                .is_err()
        );
    }

    #[test]
    fn test_big_endian_display() {
        let atom = Atom {
            kind: AtomKind::Scalar(ScalarKind::F64),
            order: ByteOrder::Big,
        };
        assert_eq!(atom.to_string(), "f64be");
    }

    #[test]
    fn test_byte_text_ignores_order() {
        let bytes = AtomKind::Text {
            length: 3,
            encoding: TextEncoding::Bytes,
        };
        let big = Atom::new(bytes.clone(), ByteOrder::Big);
        assert_eq!(big, Atom::new(bytes, ByteOrder::Little));
        assert_eq!(big.to_string(), "bytes[3]");

        let code_points = Atom::new(
            AtomKind::Text {
                length: 3,
                encoding: TextEncoding::CodePoints,
            },
            ByteOrder::Big,
        );
        assert_eq!(code_points.to_string(), "str[3]be");
        let byte = Atom::new(AtomKind::Scalar(ScalarKind::U8), ByteOrder::Big);
        assert_eq!(byte.order, ByteOrder::Little);
    }
}
