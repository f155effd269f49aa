//! Declarative descriptors used to build a [crate::resolve::Resolution].
//!
//! Descriptors are plain immutable values. Children are held behind [Arc] so a
//! descriptor can be reused at several positions of a tree; resolution never
//! depends on that sharing and treats each occurrence on its own.

use std::{fmt, sync::Arc};

use crate::{
    value::{ScalarKind, TextEncoding, Value},
    view::ViewOverride,
};

/// Value for [Field::read_only], for readability at call sites.
pub const READ_ONLY: bool = true;

/// A descriptor of any variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Scalar(Scalar),
    Text(Text),
    Array(Array),
    Structure(Structure),
}

impl Descriptor {
    /// Name declared on the descriptor, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Descriptor::Scalar(d) => d.name.as_deref(),
            Descriptor::Text(d) => d.name.as_deref(),
            Descriptor::Array(d) => d.name.as_deref(),
            Descriptor::Structure(d) => d.name.as_deref(),
        }
    }

    /// View override declared on the descriptor, if any.
    pub fn view(&self) -> Option<&ViewOverride> {
        match self {
            Descriptor::Scalar(d) => d.view.as_ref(),
            Descriptor::Text(d) => d.view.as_ref(),
            Descriptor::Array(d) => d.view.as_ref(),
            Descriptor::Structure(d) => d.view.as_ref(),
        }
    }

    /// Name of the variant, used in error paths for unnamed descriptors.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Descriptor::Scalar(_) => "Scalar",
            Descriptor::Text(_) => "Text",
            Descriptor::Array(_) => "Array",
            Descriptor::Structure(_) => "Structure",
        }
    }

    /// Returns a copy of this descriptor with another name.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match self {
            Descriptor::Scalar(d) => Descriptor::Scalar(Scalar { name, ..d }),
            Descriptor::Text(d) => Descriptor::Text(Text { name, ..d }),
            Descriptor::Array(d) => Descriptor::Array(Array { name, ..d }),
            Descriptor::Structure(d) => Descriptor::Structure(Structure { name, ..d }),
        }
    }

    /// Returns a copy of this descriptor with another view override.
    pub fn with_view(self, view: ViewOverride) -> Self {
        let view = Some(view);
        match self {
            Descriptor::Scalar(d) => Descriptor::Scalar(Scalar { view, ..d }),
            Descriptor::Text(d) => Descriptor::Text(Text { view, ..d }),
            Descriptor::Array(d) => Descriptor::Array(Array { view, ..d }),
            Descriptor::Structure(d) => Descriptor::Structure(Structure { view, ..d }),
        }
    }
}

impl From<Scalar> for Descriptor {
    fn from(value: Scalar) -> Self {
        Descriptor::Scalar(value)
    }
}

impl From<Text> for Descriptor {
    fn from(value: Text) -> Self {
        Descriptor::Text(value)
    }
}

impl From<Array> for Descriptor {
    fn from(value: Array) -> Self {
        Descriptor::Array(value)
    }
}

impl From<Structure> for Descriptor {
    fn from(value: Structure) -> Self {
        Descriptor::Structure(value)
    }
}

/// A boolean, numeric or opaque-reference atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub kind: ScalarKind,
    /// Checked against `kind` during resolution.
    pub default: Value,
    pub name: Option<String>,
    /// Constructed with the enclosing buffer and the atom's position.
    pub view: Option<ViewOverride>,
}

impl Scalar {
    /// A scalar of `kind` defaulting to its zero value.
    pub fn new(kind: ScalarKind) -> Self {
        Scalar {
            kind,
            default: kind.zero(),
            name: None,
            view: None,
        }
    }

    pub fn bool(default: bool) -> Self {
        Scalar::new(ScalarKind::Bool).with_default(default)
    }

    pub fn number(kind: ScalarKind, default: impl Into<Value>) -> Self {
        Scalar::new(kind).with_default(default)
    }

    pub fn object() -> Self {
        Scalar::new(ScalarKind::Object)
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Scalar {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn with_default(self, default: impl Into<Value>) -> Self {
        Scalar {
            default: default.into(),
            ..self
        }
    }

    pub fn with_view(self, view: ViewOverride) -> Self {
        Scalar {
            view: Some(view),
            ..self
        }
    }
}

/// Fixed-length text. The length is required and counted in units of `encoding`.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub length: usize,
    pub encoding: TextEncoding,
    /// Truncated or NUL-padded to `length` during resolution.
    pub default: Value,
    pub name: Option<String>,
    pub view: Option<ViewOverride>,
}

impl Text {
    pub fn new(length: usize, encoding: TextEncoding) -> Self {
        Text {
            length,
            encoding,
            default: encoding.empty(),
            name: None,
            view: None,
        }
    }

    /// Raw byte text of `length` bytes.
    pub fn bytes(length: usize) -> Self {
        Text::new(length, TextEncoding::Bytes)
    }

    /// Code-point text of `length` characters.
    pub fn unicode(length: usize) -> Self {
        Text::new(length, TextEncoding::CodePoints)
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Text {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn with_length(self, length: usize) -> Self {
        Text { length, ..self }
    }

    pub fn with_default(self, default: impl Into<Value>) -> Self {
        Text {
            default: default.into(),
            ..self
        }
    }

    pub fn with_view(self, view: ViewOverride) -> Self {
        Text {
            view: Some(view),
            ..self
        }
    }
}

/// Dimensions of an array, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of elements, `None` on overflow.
    pub fn count(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
    }

    /// Row-major flat index of `coords`, `None` if any coordinate is out of range.
    pub fn flatten(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.0.len() {
            return None;
        }

        let mut index = 0;
        for (coord, dim) in coords.iter().zip(&self.0) {
            if coord >= dim {
                return None;
            }
            index = index * dim + coord;
        }

        Some(index)
    }
}

impl From<usize> for Shape {
    fn from(value: usize) -> Self {
        Shape(vec![value])
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(value: [usize; N]) -> Self {
        Shape(value.to_vec())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(value: Vec<usize>) -> Self {
        Shape(value)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{dim}")?;
        }

        Ok(())
    }
}

/// A fixed-size array of elements laid out contiguously in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub element: Arc<Descriptor>,
    pub shape: Shape,
    /// Name of the generated view.
    pub name: Option<String>,
    /// Constructed with exactly the array's sub-buffer.
    pub view: Option<ViewOverride>,
}

impl Array {
    pub fn new(element: impl Into<Descriptor>, shape: impl Into<Shape>) -> Self {
        Array {
            element: Arc::new(element.into()),
            shape: shape.into(),
            name: None,
            view: None,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Array {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn with_view(self, view: ViewOverride) -> Self {
        Array {
            view: Some(view),
            ..self
        }
    }

    pub fn with_shape(self, shape: impl Into<Shape>) -> Self {
        Array {
            shape: shape.into(),
            ..self
        }
    }

    pub fn with_element(self, element: impl Into<Descriptor>) -> Self {
        Array {
            element: Arc::new(element.into()),
            ..self
        }
    }
}

/// A named member of a [Structure].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Arc<Descriptor>,
    /// When set, the generated structure view refuses writes to this field.
    pub read_only: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<Descriptor>) -> Self {
        Field {
            name: name.into(),
            ty: Arc::new(ty.into()),
            read_only: false,
        }
    }

    /// A field sharing an existing descriptor.
    pub fn shared(name: impl Into<String>, ty: Arc<Descriptor>) -> Self {
        Field {
            name: name.into(),
            ty,
            read_only: false,
        }
    }

    pub fn read_only(self, read_only: bool) -> Self {
        Field { read_only, ..self }
    }
}

/// An ordered record of fields. Declaration order fixes memory order.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub fields: Vec<Field>,
    /// Name of the generated view.
    pub name: Option<String>,
    /// Constructed with exactly the record's sub-buffer.
    pub view: Option<ViewOverride>,
}

impl Structure {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Structure {
            fields: fields.into_iter().collect(),
            name: None,
            view: None,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Structure {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn with_view(self, view: ViewOverride) -> Self {
        Structure {
            view: Some(view),
            ..self
        }
    }

    pub fn with_fields(self, fields: impl IntoIterator<Item = Field>) -> Self {
        Structure {
            fields: fields.into_iter().collect(),
            ..self
        }
    }
}
