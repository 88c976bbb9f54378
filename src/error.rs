//! Error types for triangulation and collection buffers.

use thiserror::Error;

use crate::schema::FieldFormat;

/// Errors raised when a polygon boundary cannot be triangulated.
///
/// None of these are retried internally; the input has to be fixed by the
/// caller. A failed triangulation never mutates a collection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The boundary has fewer than 3 usable points after dropping
    /// duplicates and an explicitly repeated closing point.
    #[error("polygon boundary has {count} usable points, need at least 3")]
    TooFewPoints { count: usize },
    /// The boundary encloses no area within tolerance.
    #[error("polygon area is zero within tolerance")]
    ZeroArea,
    /// The boundary collapsed during triangulation. The usual cause is a
    /// self-intersecting input, which this crate treats as a hard error
    /// rather than producing a best-effort triangulation.
    #[error("degenerate polygon boundary: {0}")]
    Degenerate(String),
}

/// Errors raised by schema construction or by override validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field name was declared more than once.
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    /// `position` is implicit and may be neither declared nor overridden.
    #[error("field `{0}` is reserved and cannot be declared or overridden")]
    ReservedField(String),
    /// A mandatory-local field declared a default value.
    #[error("mandatory-local field `{0}` must not declare a default")]
    DefaultNotAllowed(String),
    /// An optional-local or shared field was declared without a default.
    #[error("field `{0}` requires a default value")]
    MissingDefault(String),
    /// A default or override value does not match the field's format.
    #[error("value for field `{name}` has format {got:?}, expected {expected:?}")]
    FormatMismatch {
        name: String,
        expected: FieldFormat,
        got: FieldFormat,
    },
    /// An override referenced a field the schema does not declare.
    #[error("override references unknown field `{0}`")]
    UnknownField(String),
    /// A mandatory-local field has no default, so every append must
    /// supply a value for it.
    #[error("mandatory field `{0}` has no override and no default")]
    MissingValue(String),
}

/// Error type returned by [`PolygonCollection::append`].
///
/// Either error kind leaves the collection byte-identical to before the
/// failed call.
///
/// [`PolygonCollection::append`]: crate::collection::PolygonCollection::append
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectionError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
