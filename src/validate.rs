//! Structural checks run inline by the resolver.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    descriptor::{Field, Shape},
    errors::DescriptorError,
};

/// Plain identifier: a letter or underscore followed by letters, digits or underscores.
static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// Names taken by the accessors of generated views.
pub const RESERVED_NAMES: &[&str] = &[
    "contains",
    "data",
    "element_type",
    "field_names",
    "fmt",
    "get",
    "get_at",
    "get_mut",
    "is_empty",
    "is_read_only",
    "iter",
    "len",
    "set",
    "shape",
    "to_value",
    "values",
    "view_type",
];

/// Checks a field or view name.
pub(crate) fn check_name(path: &str, name: &str) -> Result<(), DescriptorError> {
    if !IDENTIFIER_REGEX.is_match(name) {
        return Err(DescriptorError::InvalidName {
            path: path.to_string(),
            name: name.to_string(),
        });
    }

    if name.starts_with("__") || RESERVED_NAMES.contains(&name) {
        return Err(DescriptorError::ReservedName {
            path: path.to_string(),
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Checks that `shape` has at least one dimension and no zero dimension.
pub(crate) fn check_shape(path: &str, shape: &Shape) -> Result<(), DescriptorError> {
    if shape.dims().is_empty() || shape.dims().contains(&0) {
        return Err(DescriptorError::InvalidShape {
            path: path.to_string(),
            shape: shape.dims().to_vec(),
        });
    }

    Ok(())
}

pub(crate) fn check_length(path: &str, length: usize) -> Result<(), DescriptorError> {
    if length == 0 {
        return Err(DescriptorError::InvalidLength {
            path: path.to_string(),
        });
    }

    Ok(())
}

/// Checks that field names are unique, reporting every duplicated name once.
pub(crate) fn check_unique(path: &str, fields: &[Field]) -> Result<(), DescriptorError> {
    let mut duplicates: Vec<String> = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let repeated = fields[..i].iter().any(|other| other.name == field.name);
        if repeated && !duplicates.contains(&field.name) {
            duplicates.push(field.name.clone());
        }
    }

    if !duplicates.is_empty() {
        return Err(DescriptorError::DuplicateFields {
            path: path.to_string(),
            names: duplicates,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{descriptor::Scalar, value::ScalarKind};

    #[test]
    fn test_valid_names() {
        assert!(check_name("S", "position").is_ok());
        assert!(check_name("S", "_private").is_ok());
        assert!(check_name("S", "x2").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "2x", "with space", "dash-ed", "é"] {
            assert_eq!(
                check_name("S", name),
                Err(DescriptorError::InvalidName {
                    path: "S".to_string(),
                    name: name.to_string(),
                })
            );
        }
    }

    #[test]
    fn test_reserved_names() {
        for name in ["len", "iter", "get", "data", "__init__"] {
            assert!(matches!(
                check_name("S", name),
                Err(DescriptorError::ReservedName { .. })
            ));
        }
    }

    #[test]
    fn test_shape() {
        assert!(check_shape("A", &Shape::from([2, 3])).is_ok());
        assert!(check_shape("A", &Shape::from(0)).is_err());
        assert!(check_shape("A", &Shape::from([2, 0])).is_err());
        assert!(check_shape("A", &Shape::from(Vec::new())).is_err());
    }

    #[test]
    fn test_length() {
        assert!(check_length("T", 1).is_ok());
        assert_eq!(
            check_length("T", 0),
            Err(DescriptorError::InvalidLength {
                path: "T".to_string()
            })
        );
    }

    #[test]
    fn test_duplicates_listed_once() {
        let fields = vec![
            Field::new("x", Scalar::new(ScalarKind::F32)),
            Field::new("y", Scalar::new(ScalarKind::F32)),
            Field::new("x", Scalar::new(ScalarKind::F32)),
            Field::new("y", Scalar::new(ScalarKind::F32)),
            Field::new("x", Scalar::new(ScalarKind::F32)),
        ];
        assert_eq!(
            check_unique("S", &fields),
            Err(DescriptorError::DuplicateFields {
                path: "S".to_string(),
                names: vec!["x".to_string(), "y".to_string()],
            })
        );
    }
}
