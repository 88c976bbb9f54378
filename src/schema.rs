//! Attribute schemas for collection buffers.
//!
//! A schema is an ordered set of named, typed fields split into three
//! scopes:
//!
//! - **Mandatory-local**: one value per vertex, no default. `position` is
//!   implicit, always first, and always [`FieldFormat::Float3`].
//! - **Optional-local**: one value per vertex with a declared default;
//!   may be overridden per item (broadcast to every vertex of the item).
//! - **Shared**: one value per item with a declared default, stored once
//!   per item in a parallel uniform arena.
//!
//! The byte layout (per-field offsets and the vertex/uniform strides) is
//! computed once at [`SchemaBuilder::build`] and never changes; a
//! collection built on a schema never mutates it.

use std::collections::{HashMap, HashSet};

use crate::error::SchemaError;

/// Name of the implicit position field.
pub const POSITION: &str = "position";

/// Semantic type of a field. All formats are 4-byte aligned, so fields
/// pack back to back in declaration order with no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Single 32-bit signed integer.
    Int,
    /// Single 32-bit unsigned integer.
    Uint,
}

impl FieldFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Uint => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

/// A single typed value for a field, used for defaults and overrides.
///
/// Local values are broadcast to every vertex of an item; shared values
/// fill one uniform row. Per-vertex override sequences are intentionally
/// not representable: the vertex count of an item is only known after
/// triangulation, so a caller cannot shape one ahead of time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Int(i32),
    Uint(u32),
}

impl FieldValue {
    /// Get the format this value satisfies.
    pub fn format(&self) -> FieldFormat {
        match self {
            Self::Float(_) => FieldFormat::Float,
            Self::Float2(_) => FieldFormat::Float2,
            Self::Float3(_) => FieldFormat::Float3,
            Self::Float4(_) => FieldFormat::Float4,
            Self::Int(_) => FieldFormat::Int,
            Self::Uint(_) => FieldFormat::Uint,
        }
    }

    /// Append this value's bytes onto an arena row.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Float(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Float2(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::Float3(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::Float4(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::Int(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
            Self::Uint(v) => out.extend_from_slice(bytemuck::bytes_of(v)),
        }
    }
}

/// Scope of a field: how many values it takes and where they live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldScope {
    /// One value per vertex, supplied on every append, no default.
    MandatoryLocal,
    /// One value per vertex, falls back to the declared default.
    OptionalLocal,
    /// One value per item, stored in the uniform arena.
    Shared,
}

impl FieldScope {
    /// Whether this scope stores one value per vertex.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::MandatoryLocal | Self::OptionalLocal)
    }

    /// Whether a declared default is required for this scope.
    pub fn requires_default(&self) -> bool {
        matches!(self, Self::OptionalLocal | Self::Shared)
    }
}

/// A named, typed field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    format: FieldFormat,
    scope: FieldScope,
    default: Option<FieldValue>,
}

impl Field {
    /// Create a field with no default.
    pub fn new(name: impl Into<String>, format: FieldFormat, scope: FieldScope) -> Self {
        Self {
            name: name.into(),
            format,
            scope,
            default: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Get the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the field format.
    pub fn format(&self) -> FieldFormat {
        self.format
    }

    /// Get the field scope.
    pub fn scope(&self) -> FieldScope {
        self.scope
    }

    /// Get the default value, if declared.
    pub fn default(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }
}

/// Builder for [`Schema`]. The implicit `position` field is prepended at
/// [`build`](Self::build); declaring it explicitly is an error.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field declaration.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a mandatory per-vertex field. Every append must override it.
    pub fn mandatory_local(self, name: impl Into<String>, format: FieldFormat) -> Self {
        self.field(Field::new(name, format, FieldScope::MandatoryLocal))
    }

    /// Add an optional per-vertex field with a default.
    pub fn optional_local(
        self,
        name: impl Into<String>,
        format: FieldFormat,
        default: FieldValue,
    ) -> Self {
        self.field(Field::new(name, format, FieldScope::OptionalLocal).with_default(default))
    }

    /// Add a per-item shared field with a default.
    pub fn shared(
        self,
        name: impl Into<String>,
        format: FieldFormat,
        default: FieldValue,
    ) -> Self {
        self.field(Field::new(name, format, FieldScope::Shared).with_default(default))
    }

    /// Validate the declarations and compute the byte layout.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut fields =
            vec![Field::new(POSITION, FieldFormat::Float3, FieldScope::MandatoryLocal)];
        fields.extend(self.fields);

        let mut seen: HashSet<&str> = HashSet::with_capacity(fields.len());
        for field in &fields[1..] {
            if field.name() == POSITION {
                return Err(SchemaError::ReservedField(POSITION.to_string()));
            }
            if !seen.insert(field.name()) {
                return Err(SchemaError::DuplicateField(field.name().to_string()));
            }
            match (field.scope().requires_default(), field.default()) {
                (true, None) => {
                    return Err(SchemaError::MissingDefault(field.name().to_string()))
                }
                (false, Some(_)) => {
                    return Err(SchemaError::DefaultNotAllowed(field.name().to_string()))
                }
                (true, Some(default)) if default.format() != field.format() => {
                    return Err(SchemaError::FormatMismatch {
                        name: field.name().to_string(),
                        expected: field.format(),
                        got: default.format(),
                    })
                }
                _ => {}
            }
        }

        let mut offsets = Vec::with_capacity(fields.len());
        let mut vertex_stride = 0;
        let mut uniform_stride = 0;
        for field in &fields {
            if field.scope().is_local() {
                offsets.push(vertex_stride);
                vertex_stride += field.format().size();
            } else {
                offsets.push(uniform_stride);
                uniform_stride += field.format().size();
            }
        }

        Ok(Schema {
            fields,
            offsets,
            vertex_stride,
            uniform_stride,
        })
    }
}

/// A fixed attribute schema: ordered fields plus their computed byte
/// layout. Position is always the first field at vertex offset 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    offsets: Vec<usize>,
    vertex_stride: usize,
    uniform_stride: usize,
}

impl Schema {
    /// The common position + RGBA color schema, color defaulting to
    /// opaque black.
    pub fn position_color() -> Self {
        SchemaBuilder::new()
            .optional_local(
                "color",
                FieldFormat::Float4,
                FieldValue::Float4([0.0, 0.0, 0.0, 1.0]),
            )
            .build()
            .expect("position_color schema is statically valid")
    }

    /// Get all fields in layout order, position first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field and its byte offset within its arena row.
    pub fn field(&self, name: &str) -> Option<(&Field, usize)> {
        self.fields
            .iter()
            .zip(&self.offsets)
            .find(|(f, _)| f.name() == name)
            .map(|(f, &o)| (f, o))
    }

    /// Iterate over the per-vertex fields, position first.
    pub fn local_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.scope().is_local())
    }

    /// Iterate over the per-item shared fields.
    pub fn shared_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| f.scope() == FieldScope::Shared)
    }

    /// Whether the schema declares any shared field.
    pub fn has_shared(&self) -> bool {
        self.uniform_stride > 0
    }

    /// Bytes per vertex row.
    pub fn vertex_stride(&self) -> usize {
        self.vertex_stride
    }

    /// Bytes per uniform row; 0 when there are no shared fields.
    pub fn uniform_stride(&self) -> usize {
        self.uniform_stride
    }
}

/// Per-append field overrides: a mapping from field name to a single
/// value, validated against the schema before any buffer mutation.
///
/// A value for a local field is broadcast to every vertex of the item; a
/// value for a shared field fills the item's uniform row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: HashMap<String, FieldValue>,
}

impl Overrides {
    /// Create an empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value.
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Get the value for a field, if set.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Iterate over the set overrides.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether no overrides are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_format_size() {
        assert_eq!(FieldFormat::Float.size(), 4);
        assert_eq!(FieldFormat::Float3.size(), 12);
        assert_eq!(FieldFormat::Float4.size(), 16);
        assert_eq!(FieldFormat::Uint.size(), 4);
    }

    #[test]
    fn test_position_is_implicit() {
        let schema = SchemaBuilder::new().build().unwrap();
        assert_eq!(schema.fields().len(), 1);
        let (position, offset) = schema.field(POSITION).unwrap();
        assert_eq!(position.format(), FieldFormat::Float3);
        assert_eq!(position.scope(), FieldScope::MandatoryLocal);
        assert_eq!(offset, 0);
        assert_eq!(schema.vertex_stride(), 12);
        assert_eq!(schema.uniform_stride(), 0);
        assert!(!schema.has_shared());
    }

    #[test]
    fn test_layout_offsets() {
        let schema = SchemaBuilder::new()
            .optional_local(
                "color",
                FieldFormat::Float4,
                FieldValue::Float4([0.0, 0.0, 0.0, 1.0]),
            )
            .shared("linewidth", FieldFormat::Float, FieldValue::Float(1.0))
            .optional_local("id", FieldFormat::Uint, FieldValue::Uint(0))
            .build()
            .unwrap();

        assert_eq!(schema.field("color").unwrap().1, 12);
        assert_eq!(schema.field("id").unwrap().1, 28);
        assert_eq!(schema.vertex_stride(), 32);
        assert_eq!(schema.field("linewidth").unwrap().1, 0);
        assert_eq!(schema.uniform_stride(), 4);
        assert!(schema.has_shared());
        assert_eq!(schema.local_fields().count(), 3);
        assert_eq!(schema.shared_fields().count(), 1);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = SchemaBuilder::new()
            .optional_local("color", FieldFormat::Float4, FieldValue::Float4([0.0; 4]))
            .shared("color", FieldFormat::Float4, FieldValue::Float4([0.0; 4]))
            .build();
        assert_eq!(result, Err(SchemaError::DuplicateField("color".to_string())));
    }

    #[test]
    fn test_position_declaration_rejected() {
        let result = SchemaBuilder::new()
            .mandatory_local(POSITION, FieldFormat::Float3)
            .build();
        assert_eq!(
            result,
            Err(SchemaError::ReservedField(POSITION.to_string()))
        );
    }

    #[test]
    fn test_default_on_mandatory_rejected() {
        let result = SchemaBuilder::new()
            .field(
                Field::new("normal", FieldFormat::Float3, FieldScope::MandatoryLocal)
                    .with_default(FieldValue::Float3([0.0, 0.0, 1.0])),
            )
            .build();
        assert_eq!(
            result,
            Err(SchemaError::DefaultNotAllowed("normal".to_string()))
        );
    }

    #[test]
    fn test_missing_default_rejected() {
        let result = SchemaBuilder::new()
            .field(Field::new("color", FieldFormat::Float4, FieldScope::OptionalLocal))
            .build();
        assert_eq!(result, Err(SchemaError::MissingDefault("color".to_string())));

        let result = SchemaBuilder::new()
            .field(Field::new("linewidth", FieldFormat::Float, FieldScope::Shared))
            .build();
        assert_eq!(
            result,
            Err(SchemaError::MissingDefault("linewidth".to_string()))
        );
    }

    #[test]
    fn test_default_format_mismatch_rejected() {
        let result = SchemaBuilder::new()
            .optional_local("color", FieldFormat::Float4, FieldValue::Float(1.0))
            .build();
        assert_eq!(
            result,
            Err(SchemaError::FormatMismatch {
                name: "color".to_string(),
                expected: FieldFormat::Float4,
                got: FieldFormat::Float,
            })
        );
    }

    #[test]
    fn test_field_value_bytes() {
        let mut out = Vec::new();
        FieldValue::Float4([0.0, 0.0, 0.0, 1.0]).write(&mut out);
        assert_eq!(out.len(), 16);
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&out[12..16]), 1.0);

        out.clear();
        FieldValue::Uint(7).write(&mut out);
        assert_eq!(bytemuck::pod_read_unaligned::<u32>(&out), 7);
    }
}
