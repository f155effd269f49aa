//! Error types for descriptor resolution and view access.

use thiserror::Error;

/// Errors produced while resolving a [crate::descriptor::Descriptor] tree.
///
/// `path` is the dotted location of the offending node, e.g. `Particle.position`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// One or more field names appear more than once in a structure.
    #[error("the structure '{path}' declares the field(s) {} multiple times", join(.names))]
    DuplicateFields { path: String, names: Vec<String> },
    /// A field or view name collides with an accessor of the generated views.
    #[error("the name '{name}' at '{path}' is reserved by the view accessors")]
    ReservedName { path: String, name: String },
    /// A field or view name is not a plain identifier.
    #[error("the name '{name}' at '{path}' is not a valid identifier")]
    InvalidName { path: String, name: String },
    /// An array shape is empty or has a zero dimension.
    #[error("the array '{path}' has an invalid shape {shape:?}")]
    InvalidShape { path: String, shape: Vec<usize> },
    /// A text descriptor has a zero length.
    #[error("the text '{path}' must have a positive length")]
    InvalidLength { path: String },
    /// A structure declares no fields.
    #[error("the structure '{path}' declares no fields")]
    EmptyStructure { path: String },
    /// A default value does not fit the kind of its descriptor.
    #[error("the default of '{path}' is expected to be {expected}, not {found}")]
    DefaultMismatch {
        path: String,
        expected: String,
        found: String,
    },
    /// The computed layout size does not fit in `usize`.
    #[error("the layout of '{path}' is too large")]
    SizeOverflow { path: String },
}

/// A view override failed its construction contract on first access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the view '{view}' could not be constructed: {reason}")]
pub struct ResolutionError {
    pub view: String,
    pub reason: String,
}

impl ResolutionError {
    pub fn contract(view: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolutionError {
            view: view.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced when a view is used in a way its layout does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// Write attempted on a field declared read-only.
    #[error("the field '{field}' of '{view}' is read-only")]
    ReadOnlyField { view: String, field: String },
    /// No field with that name exists on the structure view.
    #[error("the view '{view}' has no field '{field}'")]
    UnknownField { view: String, field: String },
    /// Positional access beyond the element count.
    #[error("index {index} is out of bounds for '{view}' of length {len}")]
    IndexOutOfBounds {
        view: String,
        index: usize,
        len: usize,
    },
    /// Multi-dimensional index with the wrong number of coordinates.
    #[error("'{view}' expects {expected} coordinates, got {found}")]
    IndexRank {
        view: String,
        expected: usize,
        found: usize,
    },
    /// The view was obtained through a shared borrow or does not support writes.
    #[error("the view '{view}' is not writable")]
    NotWritable { view: String },
    /// The view does not expose its raw buffer.
    #[error("the view '{view}' does not expose its raw data")]
    MissingRawData { view: String },
    /// The buffer length is not a whole number of records.
    #[error("a buffer of {len} bytes does not hold a whole number of {record}-byte records")]
    BufferSize { len: usize, record: usize },
    /// The value written does not match the layout at that position.
    #[error("cannot write {found} into {expected}")]
    ValueMismatch { expected: String, found: String },
}

/// Any error raised by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn join(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [single] => format!("'{single}'"),
        [first, second] => format!("'{first}' and '{second}'"),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(|name| format!("'{name}'")).collect();
            format!("{}, and '{last}'", head.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message_lists_every_name() {
        let error = DescriptorError::DuplicateFields {
            path: "Particle".to_string(),
            names: vec!["x".to_string(), "y".to_string(), "z".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "the structure 'Particle' declares the field(s) 'x', 'y', and 'z' multiple times"
        );
    }

    #[test]
    fn test_umbrella_conversion() {
        let error: Error = UsageError::MissingRawData {
            view: "Vector2".to_string(),
        }
        .into();
        assert!(matches!(error, Error::Usage(UsageError::MissingRawData { .. })));
        assert_eq!(error.to_string(), "the view 'Vector2' does not expose its raw data");
    }
}
