//! Append-only collection buffers for batched polygon rendering.
//!
//! A [`PolygonCollection`] owns three growing arenas: interleaved vertex
//! rows laid out per its [`Schema`], a flat `u32` index list, and one
//! uniform row per item when the schema declares shared fields. Each
//! [`append`](PolygonCollection::append) triangulates one polygon and
//! concatenates the result as a single item, rebasing the new indices so
//! the whole buffer stays directly usable for one indexed-triangle-list
//! draw call.
//!
//! Appends are all-or-nothing: every validation step runs before the
//! first byte of arena growth, so a failed append leaves the collection
//! byte-identical to before the call. The collection is single-threaded;
//! callers that populate from several workers either keep one collection
//! per worker or hold their own lock around the storage mutation.
//! [`triangulate`] is pure, so only
//! [`append_triangulated`](PolygonCollection::append_triangulated) needs
//! to sit inside such a critical section.

use crate::error::{CollectionError, SchemaError};
use crate::schema::{Overrides, Schema, POSITION};
use crate::shader::ShaderConfig;
use crate::triangulate::{triangulate, Polygon, TriangulatedPolygon};

/// Handle to one appended item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    /// Get the item's position in append order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One triangulated polygon's contribution to the collection: contiguous
/// ranges of the vertex and index arenas, immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    vertex_start: u32,
    vertex_count: u32,
    index_start: u32,
    index_count: u32,
}

impl Item {
    /// First vertex row of this item.
    pub fn vertex_start(&self) -> u32 {
        self.vertex_start
    }

    /// Number of vertex rows this item contributed (its itemsize). Often
    /// larger than the input boundary point count after triangulation.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// First index of this item.
    pub fn index_start(&self) -> u32 {
        self.index_start
    }

    /// Number of indices this item contributed (3 per triangle).
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Borrowed snapshot of a collection's storage for the renderer.
///
/// The index list is fully rebased, so the whole view draws with one
/// indexed triangle-list call and no further offsetting.
#[derive(Debug, Clone, Copy)]
pub struct BatchView<'a> {
    /// Interleaved vertex rows.
    pub vertex_data: &'a [u8],
    /// Bytes per vertex row.
    pub vertex_stride: usize,
    /// Rebased triangle-list indices.
    pub indices: &'a [u32],
    /// Uniform rows, one per item; empty without shared fields.
    pub uniform_data: &'a [u8],
    /// Bytes per uniform row; 0 without shared fields.
    pub uniform_stride: usize,
}

/// An append-only buffer of triangulated polygons sharing one attribute
/// schema.
///
/// # Example
///
/// ```
/// use polybatch::{Overrides, Polygon, PolygonCollection, Schema};
///
/// let mut collection = PolygonCollection::new(Schema::position_color());
/// let square = Polygon::from_xy(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
/// collection.append(&square, &Overrides::new())?;
/// assert_eq!(collection.item_count(), 1);
/// assert_eq!(collection.vertex_len(), 4);
/// # Ok::<(), polybatch::CollectionError>(())
/// ```
pub struct PolygonCollection {
    schema: Schema,
    shaders: ShaderConfig,
    vertices: Vec<u8>,
    indices: Vec<u32>,
    uniforms: Vec<u8>,
    items: Vec<Item>,
}

impl PolygonCollection {
    /// Create an empty collection with the default shader config.
    pub fn new(schema: Schema) -> Self {
        Self::with_shaders(schema, ShaderConfig::default())
    }

    /// Create an empty collection forwarding the given shader config.
    pub fn with_shaders(schema: Schema, shaders: ShaderConfig) -> Self {
        Self {
            schema,
            shaders,
            vertices: Vec::new(),
            indices: Vec::new(),
            uniforms: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Triangulate a polygon and append it as one item.
    ///
    /// Local fields other than position are filled from `overrides` if
    /// present, else from their schema default, broadcast across the
    /// item's vertices. Position always comes from the triangulated
    /// vertices. Shared fields fill one uniform row the same way.
    ///
    /// # Errors
    ///
    /// [`GeometryError`](crate::GeometryError) when triangulation fails,
    /// [`SchemaError`] when an override names an unknown or reserved
    /// field, mismatches its field's format, or a mandatory-local field
    /// is left without a value. Either way the collection is unchanged.
    pub fn append(
        &mut self,
        polygon: &Polygon,
        overrides: &Overrides,
    ) -> Result<ItemId, CollectionError> {
        let mesh = triangulate(polygon)?;
        self.append_triangulated(&mesh, overrides)
    }

    /// Append an already-triangulated polygon: the storage-mutation half
    /// of [`append`](Self::append), for callers that run [`triangulate`]
    /// outside their critical section.
    pub fn append_triangulated(
        &mut self,
        mesh: &TriangulatedPolygon,
        overrides: &Overrides,
    ) -> Result<ItemId, CollectionError> {
        self.validate_overrides(overrides)?;

        let n = mesh.vertex_count();
        let mut block = Vec::with_capacity(n * self.schema.vertex_stride());
        for vertex in mesh.vertices() {
            block.extend_from_slice(bytemuck::bytes_of(&vertex.to_array()));
            for field in self.schema.local_fields().skip(1) {
                match overrides.get(field.name()).or_else(|| field.default()) {
                    Some(value) => value.write(&mut block),
                    None => {
                        return Err(SchemaError::MissingValue(field.name().to_string()).into())
                    }
                }
            }
        }

        let mut uniform_row = Vec::with_capacity(self.schema.uniform_stride());
        for field in self.schema.shared_fields() {
            match overrides.get(field.name()).or_else(|| field.default()) {
                Some(value) => value.write(&mut uniform_row),
                None => return Err(SchemaError::MissingValue(field.name().to_string()).into()),
            }
        }

        // Everything fallible is done; grow the arenas.
        let base = self.vertex_len() as u32;
        let index_start = self.indices.len() as u32;
        for triangle in mesh.triangles() {
            for &index in triangle {
                self.indices.push(base + index);
            }
        }
        self.vertices.extend_from_slice(&block);
        self.uniforms.extend_from_slice(&uniform_row);

        let id = ItemId(self.items.len() as u32);
        self.items.push(Item {
            vertex_start: base,
            vertex_count: n as u32,
            index_start,
            index_count: (mesh.triangle_count() * 3) as u32,
        });
        log::debug!(
            "appended item {}: {} vertices, {} indices",
            id.index(),
            n,
            mesh.triangle_count() * 3
        );
        Ok(id)
    }

    fn validate_overrides(&self, overrides: &Overrides) -> Result<(), SchemaError> {
        for (name, value) in overrides.iter() {
            if name == POSITION {
                return Err(SchemaError::ReservedField(POSITION.to_string()));
            }
            let (field, _) = self
                .schema
                .field(name)
                .ok_or_else(|| SchemaError::UnknownField(name.to_string()))?;
            if value.format() != field.format() {
                return Err(SchemaError::FormatMismatch {
                    name: name.to_string(),
                    expected: field.format(),
                    got: value.format(),
                });
            }
        }
        Ok(())
    }

    /// Drop all items and storage; the schema and shader config stay.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.uniforms.clear();
        self.items.clear();
        log::debug!("collection cleared");
    }

    /// Get the attribute schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the forwarded shader config.
    pub fn shaders(&self) -> &ShaderConfig {
        &self.shaders
    }

    /// Number of items appended so far.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Whether no items have been appended.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of vertex rows across all items.
    pub fn vertex_len(&self) -> usize {
        self.vertices.len() / self.schema.vertex_stride()
    }

    /// Total number of indices across all items.
    pub fn index_len(&self) -> usize {
        self.indices.len()
    }

    /// Number of uniform rows; equals [`item_count`](Self::item_count)
    /// when the schema has shared fields, 0 otherwise.
    pub fn uniform_len(&self) -> usize {
        if self.schema.has_shared() {
            self.uniforms.len() / self.schema.uniform_stride()
        } else {
            0
        }
    }

    /// Get an item record by handle.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    /// Iterate over all item records in append order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Raw interleaved vertex rows.
    pub fn vertex_bytes(&self) -> &[u8] {
        &self.vertices
    }

    /// Rebased triangle-list indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Raw uniform rows.
    pub fn uniform_bytes(&self) -> &[u8] {
        &self.uniforms
    }

    /// Get one item's contiguous vertex rows.
    pub fn item_vertex_bytes(&self, id: ItemId) -> Option<&[u8]> {
        let item = self.item(id)?;
        let stride = self.schema.vertex_stride();
        let start = item.vertex_start() as usize * stride;
        let end = start + item.vertex_count() as usize * stride;
        Some(&self.vertices[start..end])
    }

    /// Get one item's contiguous (rebased) indices.
    pub fn item_indices(&self, id: ItemId) -> Option<&[u32]> {
        let item = self.item(id)?;
        let start = item.index_start() as usize;
        let end = start + item.index_count() as usize;
        Some(&self.indices[start..end])
    }

    /// Snapshot the storage for one batched draw call.
    pub fn view(&self) -> BatchView<'_> {
        BatchView {
            vertex_data: &self.vertices,
            vertex_stride: self.schema.vertex_stride(),
            indices: &self.indices,
            uniform_data: &self.uniforms,
            uniform_stride: self.schema.uniform_stride(),
        }
    }
}

impl std::fmt::Debug for PolygonCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolygonCollection")
            .field("items", &self.item_count())
            .field("vertices", &self.vertex_len())
            .field("indices", &self.index_len())
            .field("uniforms", &self.uniform_len())
            .field("vertex_stride", &self.schema.vertex_stride())
            .finish()
    }
}
