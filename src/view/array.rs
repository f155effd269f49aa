use std::{fmt, ops::Range, sync::Arc};

use crate::{
    descriptor::Shape,
    errors::{Result, UsageError},
    value::Value,
};

use super::{Access, Element, ElementMut, SequenceType, ViewType, element, element_mut};

/// Sequence view over a buffer of contiguous, equally sized elements.
///
/// The view borrows or owns `B` and never copies it. Elements are decoded or
/// wrapped on every access, so iterating twice always reflects the current
/// buffer contents.
pub struct ArrayView<B> {
    ty: Arc<SequenceType>,
    data: B,
}

impl<B: AsRef<[u8]>> ArrayView<B> {
    pub(crate) fn new(ty: Arc<SequenceType>, data: B) -> Self {
        ArrayView { ty, data }
    }

    pub fn view_type(&self) -> &Arc<SequenceType> {
        &self.ty
    }

    /// Generated view type of the elements, if they have one.
    pub fn element_type(&self) -> Option<ViewType> {
        match &self.ty.access {
            Access::Sequence(ty) => Some(ViewType::Sequence(ty.clone())),
            Access::Structure(ty) => Some(ViewType::Structure(ty.clone())),
            Access::Direct | Access::Atomic(_) | Access::Custom(_) => None,
        }
    }

    /// The backing buffer.
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    pub fn len(&self) -> usize {
        match &self.ty.shape {
            Some(shape) => shape.count().unwrap_or(0),
            None => self.data.as_ref().len() / self.stride(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensions of the view; the root view is one-dimensional.
    pub fn shape(&self) -> Shape {
        match &self.ty.shape {
            Some(shape) => shape.clone(),
            None => Shape::from(self.len()),
        }
    }

    pub fn get(&self, index: usize) -> Result<Element<'_>> {
        let range = self.range(index)?;
        element(
            &self.ty.access,
            &self.ty.element,
            self.data.as_ref(),
            index,
            range,
        )
    }

    /// Access by row-major coordinates, one per dimension.
    pub fn get_at(&self, coords: &[usize]) -> Result<Element<'_>> {
        let index = self.flat_index(coords)?;
        self.get(index)
    }

    /// Decoded value at `index`, ignoring any element override.
    pub fn value(&self, index: usize) -> Result<Value> {
        let range = self.range(index)?;
        Ok(self.ty.element.decode(&self.data.as_ref()[range]))
    }

    /// Fresh traversal over the elements.
    pub fn iter(&self) -> Iter<'_, B> {
        Iter {
            view: self,
            index: 0,
            len: self.len(),
        }
    }

    /// Fresh traversal over the decoded elements.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        let stride = self.stride();
        self.data.as_ref()[..self.len() * stride]
            .chunks_exact(stride)
            .map(|chunk| self.ty.element.decode(chunk))
    }

    /// True if any decoded element equals `value` once normalised for the element layout.
    pub fn contains(&self, value: &Value) -> bool {
        match self.ty.element.normalize(value) {
            Ok(needle) => self.values().any(|item| item == needle),
            Err(_) => false,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.values().collect())
    }

    fn stride(&self) -> usize {
        self.ty.element.size()
    }

    fn range(&self, index: usize) -> Result<Range<usize>, UsageError> {
        let len = self.len();
        if index >= len {
            return Err(UsageError::IndexOutOfBounds {
                view: self.ty.name.clone(),
                index,
                len,
            });
        }

        let stride = self.stride();
        Ok(index * stride..(index + 1) * stride)
    }

    fn flat_index(&self, coords: &[usize]) -> Result<usize, UsageError> {
        let shape = self.shape();
        let dims = shape.dims();
        if coords.len() != dims.len() {
            return Err(UsageError::IndexRank {
                view: self.ty.name.clone(),
                expected: dims.len(),
                found: coords.len(),
            });
        }

        if let Some((coord, dim)) = coords.iter().zip(dims).find(|(coord, dim)| coord >= dim) {
            return Err(UsageError::IndexOutOfBounds {
                view: self.ty.name.clone(),
                index: *coord,
                len: *dim,
            });
        }

        Ok(shape.flatten(coords).unwrap_or_default())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ArrayView<B> {
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    pub fn get_mut(&mut self, index: usize) -> Result<ElementMut<'_>> {
        let range = self.range(index)?;
        element_mut(
            &self.ty.access,
            &self.ty.element,
            self.data.as_mut(),
            index,
            range,
        )
    }

    pub fn get_at_mut(&mut self, coords: &[usize]) -> Result<ElementMut<'_>> {
        let index = self.flat_index(coords)?;
        self.get_mut(index)
    }

    /// Encodes `value` at `index`, bypassing any element override.
    pub fn set(&mut self, index: usize, value: &Value) -> Result<()> {
        let range = self.range(index)?;
        self.ty.element.encode(value, &mut self.data.as_mut()[range])?;
        Ok(())
    }

    pub fn set_at(&mut self, coords: &[usize], value: &Value) -> Result<()> {
        let index = self.flat_index(coords)?;
        self.set(index, value)
    }
}

/// Iterator returned by [ArrayView::iter].
pub struct Iter<'a, B> {
    view: &'a ArrayView<B>,
    index: usize,
    len: usize,
}

impl<'a, B: AsRef<[u8]>> Iterator for Iter<'a, B> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }

        let item = self.view.get(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<B: AsRef<[u8]>> ExactSizeIterator for Iter<'_, B> {}

impl<'a, B: AsRef<[u8]>> IntoIterator for &'a ArrayView<B> {
    type Item = Result<Element<'a>>;
    type IntoIter = Iter<'a, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<B: AsRef<[u8]>, C: AsRef<[u8]>> PartialEq<ArrayView<C>> for ArrayView<B> {
    fn eq(&self, other: &ArrayView<C>) -> bool {
        self.len() == other.len() && self.values().eq(other.values())
    }
}

impl<B: AsRef<[u8]>> PartialEq<Value> for ArrayView<B> {
    fn eq(&self, other: &Value) -> bool {
        self.to_value() == *other
    }
}

impl<B: AsRef<[u8]>> fmt::Display for ArrayView<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for index in 0..self.len() {
            if index > 0 {
                write!(f, ", ")?;
            }
            match self.get(index) {
                Ok(item) => write!(f, "{item}")?,
                Err(_) => write!(f, "{}", self.value(index).map_err(|_| fmt::Error)?)?,
            }
        }
        write!(f, "]")
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for ArrayView<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{self}", self.ty.name)
    }
}
