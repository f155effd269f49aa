//! Caller-supplied view overrides.
//!
//! An override replaces the generated accessor at one position of the tree.
//! It is constructed lazily, once per access, from a [Slot]: atomic overrides
//! receive the enclosing container and their position in it, composite
//! overrides receive exactly their own sub-buffer.

use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    sync::Arc,
};

use crate::{
    errors::{ResolutionError, Result, UsageError},
    layout::Layout,
    value::Value,
};

enum SlotData<'b> {
    Shared(&'b [u8]),
    Exclusive(&'b mut [u8]),
}

/// The buffer region handed to a [ViewConstructor].
pub struct Slot<'b> {
    data: SlotData<'b>,
    index: usize,
    range: Range<usize>,
    layout: &'b Layout,
    view: &'b str,
}

impl<'b> Slot<'b> {
    pub(crate) fn shared(
        data: &'b [u8],
        index: usize,
        range: Range<usize>,
        layout: &'b Layout,
        view: &'b str,
    ) -> Self {
        Slot {
            data: SlotData::Shared(data),
            index,
            range,
            layout,
            view,
        }
    }

    pub(crate) fn exclusive(
        data: &'b mut [u8],
        index: usize,
        range: Range<usize>,
        layout: &'b Layout,
        view: &'b str,
    ) -> Self {
        Slot {
            data: SlotData::Exclusive(data),
            index,
            range,
            layout,
            view,
        }
    }

    /// Position of this slot in its parent array or structure.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte range of the slot within [Slot::container].
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Layout of the bytes in [Slot::range].
    pub fn layout(&self) -> &'b Layout {
        self.layout
    }

    /// Name of the override this slot was built for.
    pub fn view_name(&self) -> &'b str {
        self.view
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.data, SlotData::Exclusive(_))
    }

    /// The whole buffer the slot was cut from.
    pub fn container(&self) -> &[u8] {
        match &self.data {
            SlotData::Shared(data) => data,
            SlotData::Exclusive(data) => data,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.container()[self.range.clone()]
    }

    /// Mutable bytes of the slot, `None` when it came from a shared borrow.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        let range = self.range.clone();
        match &mut self.data {
            SlotData::Shared(_) => None,
            SlotData::Exclusive(data) => Some(&mut data[range]),
        }
    }

    /// Decodes the slot with its own layout.
    pub fn decode(&self) -> Value {
        self.layout.decode(self.bytes())
    }

    /// Encodes `value` into the slot with its own layout.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        let layout = self.layout;
        let view = self.view;
        let bytes = self.bytes_mut().ok_or_else(|| UsageError::NotWritable {
            view: view.to_string(),
        })?;

        layout.encode(value, bytes)?;
        Ok(())
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("view", &self.view)
            .field("index", &self.index)
            .field("range", &self.range)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// An accessor object produced by a [ViewConstructor].
pub trait CustomView: fmt::Display {
    /// Name reported in errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Decoded value seen through this view.
    fn value(&self) -> Value;

    fn set_value(&mut self, _value: &Value) -> Result<()> {
        Err(UsageError::NotWritable {
            view: self.name().to_string(),
        }
        .into())
    }

    /// The recognised raw-buffer accessor used by [crate::bridge::get_data].
    fn raw_data(&self) -> Option<&[u8]> {
        None
    }

    fn raw_data_mut(&mut self) -> Option<&mut [u8]> {
        None
    }
}

/// Builds custom views from slots.
pub trait ViewConstructor: Send + Sync {
    fn name(&self) -> &str;

    fn construct<'b>(&self, slot: Slot<'b>)
    -> Result<Box<dyn CustomView + 'b>, ResolutionError>;
}

/// Signature of a plain function usable as a [ViewConstructor].
pub type ConstructFn =
    for<'b> fn(Slot<'b>) -> Result<Box<dyn CustomView + 'b>, ResolutionError>;

struct FnConstructor {
    name: String,
    construct: ConstructFn,
}

impl ViewConstructor for FnConstructor {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct<'b>(
        &self,
        slot: Slot<'b>,
    ) -> Result<Box<dyn CustomView + 'b>, ResolutionError> {
        (self.construct)(slot)
    }
}

/// A shared handle on a [ViewConstructor], attached to a descriptor.
///
/// Two overrides are equal only when they are clones of the same handle.
#[derive(Clone)]
pub struct ViewOverride(Arc<dyn ViewConstructor>);

impl ViewOverride {
    pub fn new(constructor: impl ViewConstructor + 'static) -> Self {
        ViewOverride(Arc::new(constructor))
    }

    pub fn from_fn(name: impl Into<String>, construct: ConstructFn) -> Self {
        ViewOverride::new(FnConstructor {
            name: name.into(),
            construct,
        })
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub(crate) fn construct<'b>(
        &self,
        slot: Slot<'b>,
    ) -> Result<Box<dyn CustomView + 'b>, ResolutionError> {
        let index = slot.index();
        self.0.construct(slot).inspect_err(|err| {
            tracing::debug!(view = self.name(), index, error = %err, "view override construction failed");
        })
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ViewOverride {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ViewOverride {}

impl Hash for ViewOverride {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ViewOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewOverride").field(&self.name()).finish()
    }
}

/// A ready-made custom view reading and writing its slot through the slot's layout.
pub struct SlotView<'b> {
    slot: Slot<'b>,
}

impl<'b> SlotView<'b> {
    pub fn new(slot: Slot<'b>) -> Self {
        SlotView { slot }
    }

    pub fn slot(&self) -> &Slot<'b> {
        &self.slot
    }

    pub fn slot_mut(&mut self) -> &mut Slot<'b> {
        &mut self.slot
    }
}

impl fmt::Display for SlotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slot.decode())
    }
}

impl CustomView for SlotView<'_> {
    fn name(&self) -> &str {
        self.slot.view_name()
    }

    fn value(&self) -> Value {
        self.slot.decode()
    }

    fn set_value(&mut self, value: &Value) -> Result<()> {
        self.slot.encode(value)
    }

    fn raw_data(&self) -> Option<&[u8]> {
        Some(self.slot.bytes())
    }

    fn raw_data_mut(&mut self) -> Option<&mut [u8]> {
        self.slot.bytes_mut()
    }
}
