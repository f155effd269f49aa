//! Escape hatch from views back to their raw buffers.

use crate::{
    errors::UsageError,
    view::{ArrayView, CustomView, Element, ElementMut, StructView},
};

/// A view that may expose the bytes it is backed by.
pub trait RawData {
    /// Name reported when no raw data is exposed.
    fn view_name(&self) -> &str;

    fn raw(&self) -> Option<&[u8]>;
}

pub trait RawDataMut: RawData {
    fn raw_mut(&mut self) -> Option<&mut [u8]>;
}

/// Returns the buffer backing `view` without copying it.
///
/// Generated views always expose their buffer. Custom views must implement
/// [CustomView::raw_data], otherwise [UsageError::MissingRawData] names the view.
pub fn get_data<V: RawData + ?Sized>(view: &V) -> Result<&[u8], UsageError> {
    view.raw().ok_or_else(|| UsageError::MissingRawData {
        view: view.view_name().to_string(),
    })
}

/// Mutable counterpart of [get_data].
pub fn get_data_mut<V: RawDataMut + ?Sized>(view: &mut V) -> Result<&mut [u8], UsageError> {
    let name = view.view_name().to_string();
    view.raw_mut()
        .ok_or(UsageError::MissingRawData { view: name })
}

impl<B: AsRef<[u8]>> RawData for ArrayView<B> {
    fn view_name(&self) -> &str {
        self.view_type().name()
    }

    fn raw(&self) -> Option<&[u8]> {
        Some(self.data())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> RawDataMut for ArrayView<B> {
    fn raw_mut(&mut self) -> Option<&mut [u8]> {
        Some(self.data_mut())
    }
}

impl<B: AsRef<[u8]>> RawData for StructView<B> {
    fn view_name(&self) -> &str {
        self.view_type().name()
    }

    fn raw(&self) -> Option<&[u8]> {
        Some(self.data())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> RawDataMut for StructView<B> {
    fn raw_mut(&mut self) -> Option<&mut [u8]> {
        Some(self.data_mut())
    }
}

impl RawData for dyn CustomView + '_ {
    fn view_name(&self) -> &str {
        self.name()
    }

    fn raw(&self) -> Option<&[u8]> {
        self.raw_data()
    }
}

impl RawDataMut for dyn CustomView + '_ {
    fn raw_mut(&mut self) -> Option<&mut [u8]> {
        self.raw_data_mut()
    }
}

impl<T: RawData + ?Sized> RawData for Box<T> {
    fn view_name(&self) -> &str {
        (**self).view_name()
    }

    fn raw(&self) -> Option<&[u8]> {
        (**self).raw()
    }
}

impl<T: RawDataMut + ?Sized> RawDataMut for Box<T> {
    fn raw_mut(&mut self) -> Option<&mut [u8]> {
        (**self).raw_mut()
    }
}

/// Decoded values carry no buffer.
impl RawData for Element<'_> {
    fn view_name(&self) -> &str {
        match self {
            Element::Value(_) => "Value",
            Element::Array(view) => view.view_name(),
            Element::Struct(view) => view.view_name(),
            Element::Custom(view) => view.view_name(),
        }
    }

    fn raw(&self) -> Option<&[u8]> {
        match self {
            Element::Value(_) => None,
            Element::Array(view) => view.raw(),
            Element::Struct(view) => view.raw(),
            Element::Custom(view) => view.raw(),
        }
    }
}

impl RawData for ElementMut<'_> {
    fn view_name(&self) -> &str {
        match self {
            ElementMut::Value(_) => "Value",
            ElementMut::Array(view) => view.view_name(),
            ElementMut::Struct(view) => view.view_name(),
            ElementMut::Custom(view) => view.view_name(),
        }
    }

    fn raw(&self) -> Option<&[u8]> {
        match self {
            ElementMut::Value(_) => None,
            ElementMut::Array(view) => view.raw(),
            ElementMut::Struct(view) => view.raw(),
            ElementMut::Custom(view) => view.raw(),
        }
    }
}

impl RawDataMut for ElementMut<'_> {
    fn raw_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            ElementMut::Value(_) => None,
            ElementMut::Array(view) => view.raw_mut(),
            ElementMut::Struct(view) => view.raw_mut(),
            ElementMut::Custom(view) => view.raw_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;
    use crate::{
        descriptor::{Array, Field, Scalar, Structure},
        errors::ResolutionError,
        resolve::Resolver,
        value::{ScalarKind, Value},
        view::{Slot, SlotView, ViewCache, ViewOverride},
    };

    struct Opaque(Value);

    impl fmt::Display for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "<{}>", self.0)
        }
    }

    impl CustomView for Opaque {
        fn name(&self) -> &str {
            "Opaque"
        }

        fn value(&self) -> Value {
            self.0.clone()
        }
    }

    fn opaque(slot: Slot<'_>) -> Result<Box<dyn CustomView + '_>, ResolutionError> {
        Ok(Box::new(Opaque(slot.decode())))
    }

    fn slot_view(slot: Slot<'_>) -> Result<Box<dyn CustomView + '_>, ResolutionError> {
        Ok(Box::new(SlotView::new(slot)))
    }

    #[test]
    fn test_generated_views_alias_the_buffer() {
        let cache = ViewCache::new();
        let row = Structure::new([
            Field::new("a", Scalar::new(ScalarKind::U8)),
            Field::new("b", Array::new(Scalar::new(ScalarKind::U8), 2)),
        ])
        .with_name("Row");
        let resolution = Resolver::new().cache(&cache).resolve(&row.into()).unwrap();
        let data: Vec<u8> = (0..6).collect();
        let rows = resolution.view(&data[..]).unwrap();

        assert_eq!(get_data(&rows).unwrap().as_ptr(), data.as_ptr());

        let second = rows.get(1).unwrap();
        let raw = get_data(&second).unwrap();
        assert_eq!(raw, &[3, 4, 5]);
        assert_eq!(raw.as_ptr(), data[3..].as_ptr());

        let row = second.into_struct().unwrap();
        let b = row.get("b").unwrap();
        assert_eq!(get_data(&b).unwrap(), &[4, 5]);
    }

    #[test]
    fn test_write_through_raw_data() {
        let cache = ViewCache::new();
        let resolution = Resolver::new()
            .cache(&cache)
            .resolve(&Array::new(Scalar::new(ScalarKind::U16), 2).into())
            .unwrap();
        let mut data = resolution.allocate(1);

        {
            let mut root = resolution.view(&mut data[..]).unwrap();
            let mut pair = root.get_mut(0).unwrap();
            get_data_mut(&mut pair).unwrap()[2] = 9;

            let pair = pair.into_array().unwrap();
            assert_eq!(pair.value(1).unwrap(), Value::UInt(9));
        }

        assert_eq!(data, vec![0, 0, 9, 0]);
    }

    #[test]
    fn test_custom_view_with_raw_data() {
        let cache = ViewCache::new();
        let raw = ViewOverride::from_fn("Raw", slot_view);
        let resolution = Resolver::new()
            .cache(&cache)
            .resolve(&Scalar::new(ScalarKind::U8).with_view(raw).into())
            .unwrap();
        let mut data = vec![1u8, 2];
        let mut root = resolution.view(&mut data[..]).unwrap();

        {
            let mut element = root.get_mut(1).unwrap();
            assert_eq!(get_data(&element).unwrap(), &[2]);
            get_data_mut(&mut element).unwrap()[0] = 7;
        }
        assert_eq!(root.value(1).unwrap(), Value::UInt(7));
    }

    #[test]
    fn test_custom_view_without_raw_data() {
        let cache = ViewCache::new();
        let resolution = Resolver::new()
            .cache(&cache)
            .resolve(
                &Scalar::new(ScalarKind::U8)
                    .with_view(ViewOverride::from_fn("Opaque", opaque))
                    .into(),
            )
            .unwrap();
        let data = vec![3u8];
        let root = resolution.view(&data[..]).unwrap();
        let custom = root.get(0).unwrap().into_custom().unwrap();

        assert_eq!(custom.to_string(), "<3>");
        assert_eq!(
            get_data(&custom).unwrap_err(),
            UsageError::MissingRawData {
                view: "Opaque".to_string()
            }
        );
    }

    #[test]
    fn test_decoded_values_have_no_buffer() {
        let cache = ViewCache::new();
        let resolution = Resolver::new()
            .cache(&cache)
            .resolve(&Scalar::new(ScalarKind::U8).into())
            .unwrap();
        let data = vec![0u8];
        let root = resolution.view(&data[..]).unwrap();

        assert_eq!(
            get_data(&root.get(0).unwrap()).unwrap_err(),
            UsageError::MissingRawData {
                view: "Value".to_string()
            }
        );
    }
}
