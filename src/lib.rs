//! # polybatch
//!
//! Batched polygon triangulation and collection buffers for
//! indexed-triangle rendering.
//!
//! Two pieces compose top-down:
//!
//! - [`triangulate`]: a pure function turning a simple polygon boundary
//!   (optionally with holes) into vertices plus counter-clockwise
//!   triangle index triples.
//! - [`PolygonCollection`]: an append-only buffer that triangulates each
//!   appended polygon, fills per-vertex attributes from a fixed
//!   [`Schema`] (overrides falling back to declared defaults), rebases
//!   the new indices onto the shared vertex array, and keeps one uniform
//!   row per item for shared attributes.
//!
//! The finished buffer is consumed by a renderer as one indexed
//! triangle-list draw call via [`PolygonCollection::view`]; shader
//! sources and the transform expression are forwarded untouched through
//! [`ShaderConfig`].

pub mod collection;
pub mod error;
pub mod schema;
pub mod shader;
pub mod triangulate;

pub use collection::{BatchView, Item, ItemId, PolygonCollection};
pub use error::{CollectionError, GeometryError, SchemaError};
pub use schema::{Field, FieldFormat, FieldScope, FieldValue, Overrides, Schema, SchemaBuilder};
pub use shader::ShaderConfig;
pub use triangulate::{triangulate, Polygon, TriangulatedPolygon};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
