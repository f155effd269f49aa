//! Accessor types bound to resolved layouts.
//!
//! Instead of generating a new type per layout, every layout gets a
//! [SequenceType] or [StructureType] value describing how its elements or
//! fields are reached. Those values are interned by the [ViewCache] so that
//! structurally identical descriptors share one view type. [ArrayView] and
//! [StructView] are the generic accessors driven by them.

mod array;
mod cache;
mod custom;
mod structure;

use std::{fmt, ops::Range, sync::Arc};

pub use array::{ArrayView, Iter};
pub use cache::ViewCache;
pub use custom::{ConstructFn, CustomView, Slot, SlotView, ViewConstructor, ViewOverride};
pub use structure::StructView;

use crate::{
    descriptor::Shape,
    errors::{Result, UsageError},
    layout::Layout,
    value::Value,
};

/// How an element or field is reached from its parent view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    /// Atom decoded and returned by value.
    Direct,
    /// Atom wrapped by an override built from the parent buffer and the position.
    Atomic(ViewOverride),
    /// Nested generated sequence view.
    Sequence(Arc<SequenceType>),
    /// Nested generated structure view.
    Structure(Arc<StructureType>),
    /// Nested composite wrapped by an override built from its own sub-buffer.
    Custom(ViewOverride),
}

/// View type of an array: `count` elements of `element`, or as many as the buffer holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceType {
    pub(crate) name: String,
    pub(crate) element: Layout,
    /// `None` for the root view, whose length follows the buffer.
    pub(crate) shape: Option<Shape>,
    pub(crate) access: Access,
}

impl SequenceType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_layout(&self) -> &Layout {
        &self.element
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn element_access(&self) -> &Access {
        &self.access
    }
}

/// Accessor for one field of a [StructureType].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAccessor {
    pub(crate) name: String,
    pub(crate) offset: usize,
    pub(crate) layout: Layout,
    pub(crate) read_only: bool,
    pub(crate) access: Access,
}

impl FieldAccessor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.layout.size()
    }
}

/// View type of a structure: named field accessors in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructureType {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldAccessor>,
}

impl StructureType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldAccessor] {
        &self.fields
    }
}

/// A generated view type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewType {
    Sequence(Arc<SequenceType>),
    Structure(Arc<StructureType>),
}

impl ViewType {
    pub fn name(&self) -> &str {
        match self {
            ViewType::Sequence(ty) => &ty.name,
            ViewType::Structure(ty) => &ty.name,
        }
    }

    /// True when both handles point at the same interned type.
    pub fn same(&self, other: &ViewType) -> bool {
        match (self, other) {
            (ViewType::Sequence(a), ViewType::Sequence(b)) => Arc::ptr_eq(a, b),
            (ViewType::Structure(a), ViewType::Structure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Wraps buffers into root views; the third artifact of a resolution.
#[derive(Debug, Clone)]
pub struct ViewFactory {
    ty: Arc<SequenceType>,
}

impl ViewFactory {
    pub(crate) fn new(ty: Arc<SequenceType>) -> Self {
        ViewFactory { ty }
    }

    pub fn view_type(&self) -> &Arc<SequenceType> {
        &self.ty
    }

    /// Wraps `data`, which must hold a whole number of records.
    pub fn wrap<B: AsRef<[u8]>>(&self, data: B) -> Result<ArrayView<B>, UsageError> {
        let record = self.ty.element.size();
        let len = data.as_ref().len();
        if len % record != 0 {
            return Err(UsageError::BufferSize { len, record });
        }

        Ok(ArrayView::new(self.ty.clone(), data))
    }
}

/// An element or field reached through a shared view.
pub enum Element<'a> {
    Value(Value),
    Array(ArrayView<&'a [u8]>),
    Struct(StructView<&'a [u8]>),
    Custom(Box<dyn CustomView + 'a>),
}

impl<'a> Element<'a> {
    /// Value seen through the element; custom views report their own value.
    pub fn to_value(&self) -> Value {
        match self {
            Element::Value(value) => value.clone(),
            Element::Array(view) => view.to_value(),
            Element::Struct(view) => view.to_value(),
            Element::Custom(view) => view.value(),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Element::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayView<&'a [u8]>> {
        match self {
            Element::Array(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_struct(self) -> Option<StructView<&'a [u8]>> {
        match self {
            Element::Struct(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_custom(self) -> Option<Box<dyn CustomView + 'a>> {
        match self {
            Element::Custom(view) => Some(view),
            _ => None,
        }
    }
}

impl fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Value(value) => write!(f, "{value}"),
            Element::Array(view) => write!(f, "{view}"),
            Element::Struct(view) => write!(f, "{view}"),
            Element::Custom(view) => write!(f, "{view}"),
        }
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Element::Array(view) => f.debug_tuple("Array").field(view).finish(),
            Element::Struct(view) => f.debug_tuple("Struct").field(view).finish(),
            Element::Custom(view) => write!(f, "Custom({}: {view})", view.name()),
        }
    }
}

/// An element or field reached through an exclusive view.
pub enum ElementMut<'a> {
    Value(Value),
    Array(ArrayView<&'a mut [u8]>),
    Struct(StructView<&'a mut [u8]>),
    Custom(Box<dyn CustomView + 'a>),
}

impl<'a> ElementMut<'a> {
    pub fn to_value(&self) -> Value {
        match self {
            ElementMut::Value(value) => value.clone(),
            ElementMut::Array(view) => view.to_value(),
            ElementMut::Struct(view) => view.to_value(),
            ElementMut::Custom(view) => view.value(),
        }
    }

    pub fn into_array(self) -> Option<ArrayView<&'a mut [u8]>> {
        match self {
            ElementMut::Array(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_struct(self) -> Option<StructView<&'a mut [u8]>> {
        match self {
            ElementMut::Struct(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_custom(self) -> Option<Box<dyn CustomView + 'a>> {
        match self {
            ElementMut::Custom(view) => Some(view),
            _ => None,
        }
    }
}

impl fmt::Debug for ElementMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementMut::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ElementMut::Array(view) => f.debug_tuple("Array").field(view).finish(),
            ElementMut::Struct(view) => f.debug_tuple("Struct").field(view).finish(),
            ElementMut::Custom(view) => write!(f, "Custom({}: {view})", view.name()),
        }
    }
}

/// Builds the element at `range` of `container`, reached through `access`.
pub(crate) fn element<'a>(
    access: &'a Access,
    layout: &'a Layout,
    container: &'a [u8],
    index: usize,
    range: Range<usize>,
) -> Result<Element<'a>> {
    Ok(match access {
        Access::Direct => Element::Value(layout.decode(&container[range])),
        Access::Atomic(view) => Element::Custom(view.construct(Slot::shared(
            container,
            index,
            range,
            layout,
            view.name(),
        ))?),
        Access::Sequence(ty) => Element::Array(ArrayView::new(ty.clone(), &container[range])),
        Access::Structure(ty) => Element::Struct(StructView::new(ty.clone(), &container[range])),
        Access::Custom(view) => {
            let len = range.len();
            Element::Custom(view.construct(Slot::shared(
                &container[range],
                index,
                0..len,
                layout,
                view.name(),
            ))?)
        }
    })
}

/// Mutable counterpart of [element].
pub(crate) fn element_mut<'a>(
    access: &'a Access,
    layout: &'a Layout,
    container: &'a mut [u8],
    index: usize,
    range: Range<usize>,
) -> Result<ElementMut<'a>> {
    Ok(match access {
        Access::Direct => ElementMut::Value(layout.decode(&container[range])),
        Access::Atomic(view) => ElementMut::Custom(view.construct(Slot::exclusive(
            container,
            index,
            range,
            layout,
            view.name(),
        ))?),
        Access::Sequence(ty) => {
            ElementMut::Array(ArrayView::new(ty.clone(), &mut container[range]))
        }
        Access::Structure(ty) => {
            ElementMut::Struct(StructView::new(ty.clone(), &mut container[range]))
        }
        Access::Custom(view) => {
            let len = range.len();
            ElementMut::Custom(view.construct(Slot::exclusive(
                &mut container[range],
                index,
                0..len,
                layout,
                view.name(),
            ))?)
        }
    })
}
