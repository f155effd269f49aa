use std::{fmt, sync::Arc};

use crate::{
    errors::{Result, UsageError},
    value::Value,
};

use super::{Element, ElementMut, FieldAccessor, StructureType, element, element_mut};

/// Structure view over exactly one record.
///
/// Fields are reached by name or position. Writes to fields declared
/// read-only fail before the buffer is touched.
pub struct StructView<B> {
    ty: Arc<StructureType>,
    data: B,
}

impl<B: AsRef<[u8]>> StructView<B> {
    pub(crate) fn new(ty: Arc<StructureType>, data: B) -> Self {
        StructView { ty, data }
    }

    pub fn view_type(&self) -> &Arc<StructureType> {
        &self.ty
    }

    /// The backing record.
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.ty.fields.iter().map(|field| field.name.as_str())
    }

    pub fn is_read_only(&self, name: &str) -> Result<bool> {
        Ok(self.accessor(name)?.1.read_only)
    }

    pub fn get(&self, name: &str) -> Result<Element<'_>> {
        let (position, field) = self.accessor(name)?;
        element(
            &field.access,
            &field.layout,
            self.data.as_ref(),
            position,
            field.range(),
        )
    }

    /// Access by declaration position.
    pub fn get_at(&self, position: usize) -> Result<Element<'_>> {
        let field = self
            .ty
            .fields
            .get(position)
            .ok_or_else(|| UsageError::IndexOutOfBounds {
                view: self.ty.name.clone(),
                index: position,
                len: self.ty.fields.len(),
            })?;

        element(
            &field.access,
            &field.layout,
            self.data.as_ref(),
            position,
            field.range(),
        )
    }

    /// Decoded value of a field, ignoring any field override.
    pub fn value(&self, name: &str) -> Result<Value> {
        let (_, field) = self.accessor(name)?;
        Ok(field.layout.decode(&self.data.as_ref()[field.range()]))
    }

    pub fn to_value(&self) -> Value {
        let data = self.data.as_ref();
        Value::Record(
            self.ty
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.layout.decode(&data[field.range()])))
                .collect(),
        )
    }

    fn accessor(&self, name: &str) -> Result<(usize, &FieldAccessor), UsageError> {
        self.ty
            .fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
            .ok_or_else(|| UsageError::UnknownField {
                view: self.ty.name.clone(),
                field: name.to_string(),
            })
    }

    fn writable(&self, name: &str) -> Result<(usize, &FieldAccessor), UsageError> {
        let (position, field) = self.accessor(name)?;
        if field.read_only {
            return Err(UsageError::ReadOnlyField {
                view: self.ty.name.clone(),
                field: name.to_string(),
            });
        }

        Ok((position, field))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> StructView<B> {
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Mutable access to a writable field.
    pub fn get_mut(&mut self, name: &str) -> Result<ElementMut<'_>> {
        let (position, _) = self.writable(name)?;
        let field = &self.ty.fields[position];
        element_mut(
            &field.access,
            &field.layout,
            self.data.as_mut(),
            position,
            field.range(),
        )
    }

    /// Encodes `value` into a writable field, bypassing any field override.
    pub fn set(&mut self, name: &str, value: &Value) -> Result<()> {
        let (position, _) = self.writable(name)?;
        let field = &self.ty.fields[position];
        field
            .layout
            .encode(value, &mut self.data.as_mut()[field.range()])?;
        Ok(())
    }
}

impl<B: AsRef<[u8]>, C: AsRef<[u8]>> PartialEq<StructView<C>> for StructView<B> {
    fn eq(&self, other: &StructView<C>) -> bool {
        self.to_value() == other.to_value()
    }
}

impl<B: AsRef<[u8]>> PartialEq<Value> for StructView<B> {
    fn eq(&self, other: &Value) -> bool {
        self.to_value() == *other
    }
}

impl<B: AsRef<[u8]>> fmt::Display for StructView<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ty.name)?;
        for (position, field) in self.ty.fields.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            match self.get_at(position) {
                Ok(item) => write!(f, "{}={item}", field.name)?,
                Err(_) => write!(
                    f,
                    "{}={}",
                    field.name,
                    field.layout.decode(&self.data.as_ref()[field.range()])
                )?,
            }
        }
        write!(f, ")")
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for StructView<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
