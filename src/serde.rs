//! JSON-deserializable descriptor definitions.
//!
//! These types describe a descriptor tree in a form that can ship as a
//! schema file and be converted into [Descriptor]s. View overrides are code,
//! not data, and are attached afterwards with the `with_view` helpers.

use serde::{Deserialize, Serialize};

use crate::{
    descriptor::{Array, Descriptor, Field, Scalar, Structure, Text},
    value::{ScalarKind, TextEncoding, Value},
};

/// Default value of a scalar or text definition.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DefaultDef {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

/// A descriptor definition, tagged by its `type`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum DescriptorDef {
    Scalar {
        kind: ScalarKind,
        #[serde(default)]
        default: Option<DefaultDef>,
        #[serde(default)]
        name: Option<String>,
    },
    Text {
        length: usize,
        /// Defaults to [TextEncoding::Bytes].
        #[serde(default)]
        encoding: Option<TextEncoding>,
        #[serde(default)]
        default: Option<DefaultDef>,
        #[serde(default)]
        name: Option<String>,
    },
    Array {
        element: Box<DescriptorDef>,
        shape: Vec<usize>,
        #[serde(default)]
        name: Option<String>,
    },
    Structure {
        fields: Vec<FieldDef>,
        #[serde(default)]
        name: Option<String>,
    },
}

/// A named field of a structure definition.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: DescriptorDef,
    #[serde(default)]
    pub read_only: bool,
}

impl From<DefaultDef> for Value {
    fn from(value: DefaultDef) -> Self {
        match value {
            DefaultDef::Bool(v) => Value::Bool(v),
            DefaultDef::Int(v) => Value::Int(v),
            DefaultDef::UInt(v) => Value::UInt(v),
            DefaultDef::Float(v) => Value::Float(v),
            DefaultDef::Str(v) => Value::Str(v),
        }
    }
}

impl From<DescriptorDef> for Descriptor {
    fn from(value: DescriptorDef) -> Self {
        match value {
            DescriptorDef::Scalar {
                kind,
                default,
                name,
            } => {
                let mut scalar = Scalar::new(kind);
                if let Some(default) = default {
                    scalar = scalar.with_default(default);
                }
                Descriptor::Scalar(Scalar { name, ..scalar })
            }
            DescriptorDef::Text {
                length,
                encoding,
                default,
                name,
            } => {
                let mut text = Text::new(length, encoding.unwrap_or(TextEncoding::Bytes));
                if let Some(default) = default {
                    text = text.with_default(default);
                }
                Descriptor::Text(Text { name, ..text })
            }
            DescriptorDef::Array {
                element,
                shape,
                name,
            } => Descriptor::Array(Array {
                name,
                ..Array::new(Descriptor::from(*element), shape)
            }),
            DescriptorDef::Structure { fields, name } => Descriptor::Structure(Structure {
                name,
                ..Structure::new(fields.into_iter().map(Field::from))
            }),
        }
    }
}

impl From<FieldDef> for Field {
    fn from(value: FieldDef) -> Self {
        Field::new(value.name, value.ty).read_only(value.read_only)
    }
}
