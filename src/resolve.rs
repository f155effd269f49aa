//! Descriptor resolution.
//!
//! The resolver walks a descriptor tree bottom-up, validating every node, and
//! produces the concrete [Layout], the default [Value] template and a
//! [ViewFactory] whose view types are interned in a [ViewCache]. Nothing is
//! interned until the whole tree has resolved, so a failed resolution leaves
//! the cache untouched.

use std::sync::Arc;

use crate::{
    descriptor::{Array, Descriptor, Structure},
    errors::{DescriptorError, UsageError},
    layout::{Atom, AtomKind, FieldLayout, Layout},
    validate::{check_length, check_name, check_shape, check_unique},
    value::{ByteOrder, Value},
    view::{
        Access, ArrayView, FieldAccessor, SequenceType, StructureType, ViewCache, ViewFactory,
        ViewOverride,
    },
};

/// Name of generated sequence views whose descriptor declares none.
pub const DEFAULT_ARRAY_VIEW: &str = "ArrayView";
/// Name of generated structure views whose descriptor declares none.
pub const DEFAULT_STRUCTURE_VIEW: &str = "StructureView";

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    layout: Layout,
    default: Value,
    factory: ViewFactory,
}

impl Resolution {
    /// Layout of one record.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Default template of one record.
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// The interned type of the root view.
    pub fn view_type(&self) -> &Arc<SequenceType> {
        self.factory.view_type()
    }

    pub fn view_factory(&self) -> ViewFactory {
        self.factory.clone()
    }

    pub fn into_parts(self) -> (Layout, Value, ViewFactory) {
        (self.layout, self.default, self.factory)
    }

    /// Wraps `data` as a sequence of records.
    pub fn view<B: AsRef<[u8]>>(&self, data: B) -> Result<ArrayView<B>, UsageError> {
        self.factory.wrap(data)
    }

    /// Allocates `count` records, each initialised from the default template.
    pub fn allocate(&self, count: usize) -> Vec<u8> {
        let record = self.layout.size();
        let mut data = vec![0u8; record * count];
        for chunk in data.chunks_exact_mut(record) {
            self.layout.write(&self.default, chunk);
        }
        data
    }
}

struct Node {
    layout: Layout,
    default: Value,
    access: Access,
}

/// Configures and runs resolution.
///
/// ```
/// use viewcraft::{Resolver, ByteOrder, Scalar, ScalarKind};
///
/// let resolution = Resolver::new()
///     .name("Samples")
///     .byte_order(ByteOrder::Big)
///     .resolve(&Scalar::new(ScalarKind::U16).into())
///     .unwrap();
/// assert_eq!(resolution.layout().to_string(), "u16be");
/// ```
#[derive(Debug, Clone)]
pub struct Resolver<'c> {
    name: Option<String>,
    order: ByteOrder,
    cache: &'c ViewCache,
}

impl Resolver<'static> {
    /// A little-endian resolver backed by the global cache.
    pub fn new() -> Self {
        Resolver {
            name: None,
            order: ByteOrder::default(),
            cache: ViewCache::global(),
        }
    }
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Resolver::new()
    }
}

impl<'c> Resolver<'c> {
    /// Name of the root sequence view, [DEFAULT_ARRAY_VIEW] when unset.
    ///
    /// The root descriptor keeps its own name for its element views.
    pub fn name(self, name: impl Into<String>) -> Self {
        Resolver {
            name: Some(name.into()),
            ..self
        }
    }

    /// Byte order of every multi-byte atom.
    pub fn byte_order(self, order: ByteOrder) -> Self {
        Resolver { order, ..self }
    }

    pub fn cache<'d>(self, cache: &'d ViewCache) -> Resolver<'d> {
        Resolver {
            name: self.name,
            order: self.order,
            cache,
        }
    }

    /// Resolves `descriptor` and interns its view types.
    pub fn resolve(&self, descriptor: &Descriptor) -> Result<Resolution, DescriptorError> {
        let (layout, default, root) = self.prepare(descriptor)?;
        let ty = self.cache.intern_sequence(root);

        tracing::debug!(
            name = ty.name(),
            size = layout.size(),
            "resolved descriptor"
        );

        Ok(Resolution {
            layout,
            default,
            factory: ViewFactory::new(ty),
        })
    }

    /// Runs every check of [Resolver::resolve] without interning anything.
    pub fn validate(&self, descriptor: &Descriptor) -> Result<(), DescriptorError> {
        self.prepare(descriptor).map(|_| ())
    }

    fn prepare(
        &self,
        descriptor: &Descriptor,
    ) -> Result<(Layout, Value, SequenceType), DescriptorError> {
        let path = descriptor.name().unwrap_or(descriptor.variant_name());
        tracing::trace!(path, order = ?self.order, "resolving descriptor");

        if let Some(name) = &self.name {
            check_name(path, name)?;
        }

        let node = self.node(descriptor, path).inspect_err(|err| {
            tracing::debug!(path, error = %err, "descriptor rejected");
        })?;

        let root = SequenceType {
            name: self.name.as_deref().unwrap_or(DEFAULT_ARRAY_VIEW).to_string(),
            element: node.layout.clone(),
            shape: None,
            access: node.access,
        };

        Ok((node.layout, node.default, root))
    }

    fn node(&self, descriptor: &Descriptor, path: &str) -> Result<Node, DescriptorError> {
        if let Some(name) = descriptor.name() {
            check_name(path, name)?;
        }

        match descriptor {
            Descriptor::Scalar(scalar) => self.atom(
                path,
                AtomKind::Scalar(scalar.kind),
                &scalar.default,
                scalar.view.as_ref(),
            ),
            Descriptor::Text(text) => {
                check_length(path, text.length)?;
                if text.length.checked_mul(text.encoding.unit_size()).is_none() {
                    return Err(overflow(path));
                }

                self.atom(
                    path,
                    AtomKind::Text {
                        length: text.length,
                        encoding: text.encoding,
                    },
                    &text.default,
                    text.view.as_ref(),
                )
            }
            Descriptor::Array(array) => self.array(path, array),
            Descriptor::Structure(structure) => self.structure(path, structure),
        }
    }

    fn atom(
        &self,
        path: &str,
        kind: AtomKind,
        default: &Value,
        view: Option<&ViewOverride>,
    ) -> Result<Node, DescriptorError> {
        let atom = Atom::new(kind, self.order);
        let normalized = atom
            .coerce(default)
            .ok_or_else(|| DescriptorError::DefaultMismatch {
                path: path.to_string(),
                expected: atom.to_string(),
                found: default.kind_name(),
            })?;

        Ok(Node {
            layout: Layout::Atom(atom),
            default: normalized,
            access: match view {
                Some(view) => Access::Atomic(view.clone()),
                None => Access::Direct,
            },
        })
    }

    fn array(&self, path: &str, array: &Array) -> Result<Node, DescriptorError> {
        check_shape(path, &array.shape)?;

        let element_path = format!(
            "{path}.{}",
            array
                .element
                .name()
                .unwrap_or(array.element.variant_name())
        );
        let element = self.node(&array.element, &element_path)?;

        let count = array.shape.count().ok_or_else(|| overflow(path))?;
        let size = element
            .layout
            .size()
            .checked_mul(count)
            .ok_or_else(|| overflow(path))?;

        let access = match &array.view {
            Some(view) => Access::Custom(view.clone()),
            None => Access::Sequence(Arc::new(SequenceType {
                name: array
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ARRAY_VIEW.to_string()),
                element: element.layout.clone(),
                shape: Some(array.shape.clone()),
                access: element.access,
            })),
        };

        Ok(Node {
            default: Value::Array(vec![element.default; count]),
            layout: Layout::Array {
                element: Box::new(element.layout),
                shape: array.shape.clone(),
                size,
            },
            access,
        })
    }

    fn structure(&self, path: &str, structure: &Structure) -> Result<Node, DescriptorError> {
        if structure.fields.is_empty() {
            return Err(DescriptorError::EmptyStructure {
                path: path.to_string(),
            });
        }

        check_unique(path, &structure.fields)?;

        let mut offset = 0usize;
        let mut layouts = Vec::with_capacity(structure.fields.len());
        let mut accessors = Vec::with_capacity(structure.fields.len());
        let mut defaults = Vec::with_capacity(structure.fields.len());

        for field in &structure.fields {
            check_name(path, &field.name)?;

            let node = self.node(&field.ty, &format!("{path}.{}", field.name))?;
            let size = node.layout.size();

            accessors.push(FieldAccessor {
                name: field.name.clone(),
                offset,
                layout: node.layout.clone(),
                read_only: field.read_only,
                access: node.access,
            });
            layouts.push(FieldLayout {
                name: field.name.clone(),
                offset,
                layout: node.layout,
            });
            defaults.push((field.name.clone(), node.default));

            offset = offset.checked_add(size).ok_or_else(|| overflow(path))?;
        }

        let access = match &structure.view {
            Some(view) => Access::Custom(view.clone()),
            None => Access::Structure(Arc::new(StructureType {
                name: structure
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STRUCTURE_VIEW.to_string()),
                fields: accessors,
            })),
        };

        Ok(Node {
            layout: Layout::Structure {
                fields: layouts,
                size: offset,
            },
            default: Value::Record(defaults),
            access,
        })
    }
}

fn overflow(path: &str) -> DescriptorError {
    DescriptorError::SizeOverflow {
        path: path.to_string(),
    }
}
