//! # viewcraft
//!
//! Compile declarative binary layout descriptors into concrete layouts,
//! default templates and zero-copy views over raw buffers.
//!
//! A descriptor tree of scalars, fixed-length texts, fixed-shape arrays and
//! structures is resolved into a [Layout] (sizes and offsets), a default
//! [Value] template and a [ViewFactory]. The factory wraps byte buffers into
//! views that decode and encode elements in place. View types are interned
//! per structural layout, so identical descriptors share one view type.
//!
//! ## Example
//!
//! ```
//! use viewcraft::{Array, Field, Scalar, ScalarKind, Structure, Value, resolve};
//!
//! let particle = Structure::new([
//!     Field::new("id", Scalar::number(ScalarKind::U32, 1u32)),
//!     Field::new("position", Array::new(Scalar::new(ScalarKind::F32), 2)),
//! ])
//! .with_name("Particle");
//!
//! let resolution = resolve(&particle.into(), None).unwrap();
//! let mut data = resolution.allocate(2);
//! let mut particles = resolution.view(&mut data[..]).unwrap();
//!
//! let mut second = particles.get_mut(1).unwrap().into_struct().unwrap();
//! second.set("position", &Value::Array(vec![1.5.into(), 2.0.into()])).unwrap();
//!
//! assert_eq!(
//!     particles.to_string(),
//!     "[Particle(id=1, position=[0.0, 0.0]), Particle(id=1, position=[1.5, 2.0])]"
//! );
//! ```

pub mod bridge;
pub mod descriptor;
pub mod errors;
pub mod layout;
pub mod resolve;
#[cfg(feature = "serde")]
pub mod serde;
pub mod validate;
pub mod value;
pub mod view;

pub use bridge::{RawData, RawDataMut, get_data, get_data_mut};
pub use descriptor::{Array, Descriptor, Field, READ_ONLY, Scalar, Shape, Structure, Text};
pub use errors::{DescriptorError, Error, ResolutionError, Result, UsageError};
pub use layout::Layout;
pub use resolve::{Resolution, Resolver};
pub use value::{ByteOrder, ScalarKind, TextEncoding, Value};
pub use view::{
    ArrayView, CustomView, Element, ElementMut, Slot, SlotView, StructView, ViewCache,
    ViewConstructor, ViewFactory, ViewOverride, ViewType,
};

/// Resolves `descriptor` with the global cache.
///
/// `name` names the root sequence view. The descriptor's own name still names
/// the views of its records.
pub fn resolve(
    descriptor: &Descriptor,
    name: Option<&str>,
) -> Result<Resolution, DescriptorError> {
    let resolver = Resolver::new();
    match name {
        Some(name) => resolver.name(name).resolve(descriptor),
        None => resolver.resolve(descriptor),
    }
}

/// Checks `descriptor` without resolving views or touching any cache.
pub fn validate(descriptor: &Descriptor) -> Result<(), DescriptorError> {
    Resolver::new().validate(descriptor)
}
