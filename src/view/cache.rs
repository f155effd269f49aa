//! Process-wide interning of generated view types.

use std::{
    collections::HashSet,
    hash::Hash,
    sync::Arc,
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::{Access, FieldAccessor, SequenceType, StructureType, ViewType};

static GLOBAL: Lazy<ViewCache> = Lazy::new(ViewCache::new);

#[derive(Debug, Default)]
struct Types {
    sequences: HashSet<Arc<SequenceType>>,
    structures: HashSet<Arc<StructureType>>,
}

/// Interns view types by structural equality so identical layouts share one type.
///
/// Entries are never evicted. Interning is idempotent: concurrent callers
/// racing on the same type all receive the instance that was inserted first.
#[derive(Debug, Default)]
pub struct ViewCache {
    types: RwLock<Types>,
}

impl ViewCache {
    pub fn new() -> Self {
        ViewCache::default()
    }

    /// The cache used by [crate::resolve()] and [crate::Resolver::new].
    pub fn global() -> &'static ViewCache {
        &GLOBAL
    }

    /// Number of interned view types.
    pub fn len(&self) -> usize {
        let types = self.types.read();
        types.sequences.len() + types.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, ty: &ViewType) -> bool {
        let types = self.types.read();
        match ty {
            ViewType::Sequence(ty) => types.sequences.contains(&**ty),
            ViewType::Structure(ty) => types.structures.contains(&**ty),
        }
    }

    /// Returns the canonical instance of `ty`, interning it and its nested types.
    pub fn intern(&self, ty: ViewType) -> ViewType {
        match ty {
            ViewType::Sequence(ty) => ViewType::Sequence(self.intern_sequence((*ty).clone())),
            ViewType::Structure(ty) => ViewType::Structure(self.intern_structure((*ty).clone())),
        }
    }

    pub(crate) fn intern_sequence(&self, ty: SequenceType) -> Arc<SequenceType> {
        let ty = SequenceType {
            access: self.intern_access(&ty.access),
            ..ty
        };

        lookup_or_insert(&self.types, |types| &mut types.sequences, |types| &types.sequences, ty)
    }

    pub(crate) fn intern_structure(&self, ty: StructureType) -> Arc<StructureType> {
        let ty = StructureType {
            fields: ty
                .fields
                .iter()
                .map(|field| FieldAccessor {
                    access: self.intern_access(&field.access),
                    ..field.clone()
                })
                .collect(),
            ..ty
        };

        lookup_or_insert(&self.types, |types| &mut types.structures, |types| &types.structures, ty)
    }

    fn intern_access(&self, access: &Access) -> Access {
        match access {
            Access::Sequence(ty) => Access::Sequence(self.intern_sequence((**ty).clone())),
            Access::Structure(ty) => Access::Structure(self.intern_structure((**ty).clone())),
            Access::Direct | Access::Atomic(_) | Access::Custom(_) => access.clone(),
        }
    }
}

trait Named {
    fn type_name(&self) -> &str;
}

impl Named for SequenceType {
    fn type_name(&self) -> &str {
        &self.name
    }
}

impl Named for StructureType {
    fn type_name(&self) -> &str {
        &self.name
    }
}

fn lookup_or_insert<T: Hash + Eq + Named>(
    types: &RwLock<Types>,
    set_mut: impl Fn(&mut Types) -> &mut HashSet<Arc<T>>,
    set: impl Fn(&Types) -> &HashSet<Arc<T>>,
    ty: T,
) -> Arc<T> {
    {
        let read = types.read();
        if let Some(hit) = set(&read).get(&ty) {
            tracing::trace!(name = ty.type_name(), "view type cache hit");
            return hit.clone();
        }
    }

    let mut types = types.write();
    let entries = set_mut(&mut types);
    if let Some(hit) = entries.get(&ty) {
        return hit.clone();
    }

    tracing::debug!(name = ty.type_name(), "generated view type");
    let ty = Arc::new(ty);
    entries.insert(ty.clone());
    ty
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{
        descriptor::{Array, Descriptor, Field, Scalar, Structure},
        resolve::Resolver,
        value::ScalarKind,
    };

    fn vector2() -> Descriptor {
        Array::new(Scalar::new(ScalarKind::F32), 2)
            .with_name("Vector2")
            .into()
    }

    #[test]
    fn test_structurally_equal_descriptors_share_a_type() {
        let cache = ViewCache::new();
        let first = Resolver::new().cache(&cache).resolve(&vector2()).unwrap();
        let second = Resolver::new().cache(&cache).resolve(&vector2()).unwrap();

        assert!(Arc::ptr_eq(first.view_type(), second.view_type()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_nested_types_are_canonical() {
        let cache = ViewCache::new();
        let standalone = Resolver::new().cache(&cache).resolve(&vector2()).unwrap();
        let particle = Structure::new([
            Field::new("position", vector2()),
            Field::new("velocity", vector2()),
        ])
        .with_name("Particle");
        let nested = Resolver::new().cache(&cache).resolve(&particle.into()).unwrap();

        let Some(ViewType::Sequence(vector)) = standalone
            .view_factory()
            .wrap(&[0u8; 8][..])
            .unwrap()
            .element_type()
        else {
            panic!("expected a sequence element type");
        };
        let Some(ViewType::Structure(particle)) = nested
            .view_factory()
            .wrap(&[0u8; 16][..])
            .unwrap()
            .element_type()
        else {
            panic!("expected a structure element type");
        };

        for field in particle.fields() {
            let Access::Sequence(field_type) = field.access() else {
                panic!("expected a generated field view");
            };
            assert!(Arc::ptr_eq(field_type, &vector));
        }
    }

    #[test]
    fn test_different_names_are_different_types() {
        let cache = ViewCache::new();
        let first = Resolver::new().cache(&cache).resolve(&vector2()).unwrap();
        let renamed = vector2().with_name("Point2");
        let second = Resolver::new().cache(&cache).resolve(&renamed).unwrap();

        assert!(!Arc::ptr_eq(first.view_type(), second.view_type()));
    }

    #[test]
    fn test_concurrent_interning_yields_one_type() {
        let owned = ViewCache::new();
        let cache = &owned;
        let types: Vec<Arc<SequenceType>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        Resolver::new()
                            .cache(cache)
                            .resolve(&vector2())
                            .unwrap()
                            .view_type()
                            .clone()
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        for ty in &types[1..] {
            assert!(Arc::ptr_eq(ty, &types[0]));
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_intern_public_entry_point() {
        let cache = ViewCache::new();
        let resolution = Resolver::new().cache(&cache).resolve(&vector2()).unwrap();
        let ty = ViewType::Sequence(Arc::new((**resolution.view_type()).clone()));

        assert!(cache.contains(&ty));
        assert!(cache.intern(ty).same(&ViewType::Sequence(resolution.view_type().clone())));
    }
}
