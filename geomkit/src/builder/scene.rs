//! Finished scenes and packed vertex data
use super::{GeometryId, NodeId, Palette, SceneNode};
use crate::{
    array::RawArray,
    geometry::{Field, GeometryData},
    indexed::IndexVec,
};
use enum_map::EnumMap;

/// Indexed vertex data shared by every section with the same field set
///
/// This is a read-only wrapper around [`GeometryData`]; use
/// [`interleaved`](Self::interleaved) to get a single buffer suitable for
/// uploading to a GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedGeometry(pub(crate) GeometryData);

impl std::ops::Deref for PackedGeometry {
    type Target = GeometryData;
    fn deref(&self) -> &GeometryData {
        &self.0
    }
}

impl PackedGeometry {
    /// Returns the number of complete triangles in the index array
    pub fn triangle_count(&self) -> usize {
        self.index_count() / 3
    }

    /// Iterates over triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices()
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
    }

    /// Builds an interleaved `f32` vertex buffer
    ///
    /// Fields are laid out in [`Field`] order; colors are expanded to four
    /// floats in the `0.0..=1.0` range.
    pub fn interleaved(&self) -> VertexBuffer {
        let mut out = VertexBuffer {
            data: RawArray::new(),
            stride: 0,
            offsets: EnumMap::default(),
        };
        for f in self.fields().iter() {
            let column = self.column(f);
            out.data = if out.stride == 0 {
                column
            } else {
                out.data.interleaved(out.stride, &column, f.components())
            };
            out.offsets[f] = Some(out.stride);
            out.stride += f.components();
        }
        out
    }

    /// Flattens a single field into `f32` components
    fn column(&self, f: Field) -> RawArray<f32> {
        let mut out = RawArray::new();
        out.reserve(self.count() * f.components());
        match f {
            Field::Position => self
                .positions()
                .iter()
                .for_each(|p| out.append_slice(p.as_slice())),
            Field::Normal => self
                .normals()
                .iter()
                .for_each(|n| out.append_slice(n.as_slice())),
            Field::TexCoord => self
                .tex_coords()
                .iter()
                .for_each(|t| out.append_slice(t.as_slice())),
            Field::Color => self
                .colors()
                .iter()
                .for_each(|c| out.append_slice(&c.to_f32s())),
        }
        out
    }
}

/// An interleaved vertex buffer built by [`PackedGeometry::interleaved`]
#[derive(Clone, Debug)]
pub struct VertexBuffer {
    data: RawArray<f32>,
    stride: usize,
    offsets: EnumMap<Field, Option<usize>>,
}

impl VertexBuffer {
    /// Returns the interleaved data
    pub fn data(&self) -> &RawArray<f32> {
        &self.data
    }

    /// Returns the data as bytes, ready for upload
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Returns the number of `f32` values per vertex
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of vertices
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// Checks whether the buffer holds no vertices
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the offset of a field within each vertex, in `f32` units
    pub fn offset(&self, f: Field) -> Option<usize> {
        self.offsets[f]
    }

    /// Pulls a single field back out of the buffer
    pub fn component(&self, f: Field) -> Option<RawArray<f32>> {
        let offset = self.offsets[f]?;
        Some(self.data.extract(offset, f.components(), self.stride))
    }
}

////////////////////////////////////////////////////////////////////////////////

/// A finished scene, returned by
/// [`GeometryBuilder::finalized_scene_node`](super::GeometryBuilder::finalized_scene_node)
///
/// Every node refers to a range of indices in one [`PackedGeometry`].
pub struct Scene {
    pub(crate) nodes: IndexVec<SceneNode, NodeId>,
    pub(crate) root: NodeId,
    pub(crate) geometries: IndexVec<PackedGeometry, GeometryId>,
    pub(crate) palette: Option<Palette>,
}

impl Scene {
    /// Returns the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Looks up a node
    ///
    /// # Panics
    /// If the node is not part of this scene
    pub fn node(&self, n: NodeId) -> &SceneNode {
        &self.nodes[n]
    }

    /// Looks up a node for editing
    pub fn node_mut(&mut self, n: NodeId) -> &mut SceneNode {
        &mut self.nodes[n]
    }

    /// Returns the children of a node
    pub fn children(&self, n: NodeId) -> &[NodeId] {
        self.nodes[n].children()
    }

    /// Returns the total number of nodes, including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over every node in the scene
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    /// Finds the first node (in depth-first order) with the given name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.walk().find(|n| self.nodes[*n].name() == name)
    }

    /// Iterates over node ids in depth-first order, starting at the root
    pub fn walk(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut todo = vec![self.root];
        std::iter::from_fn(move || {
            let n = todo.pop()?;
            todo.extend(self.nodes[n].children().iter().rev());
            Some(n)
        })
    }

    /// Returns the number of packed geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Iterates over packed geometries
    pub fn geometries(
        &self,
    ) -> impl Iterator<Item = (GeometryId, &PackedGeometry)> {
        self.geometries.iter()
    }

    /// Looks up a packed geometry
    pub fn geometry(&self, g: GeometryId) -> &PackedGeometry {
        &self.geometries[g]
    }

    /// Returns the packed geometry drawn by a node, if any
    pub fn geometry_of(&self, n: NodeId) -> Option<&PackedGeometry> {
        self.nodes[n].geometry().and_then(|g| self.geometries.get(g))
    }

    /// Returns the index ranges drawn by the scene, in depth-first order
    ///
    /// Each item is `(node, geometry, start, count)`; nodes that draw
    /// nothing themselves are skipped.
    pub fn draw_ranges(
        &self,
    ) -> impl Iterator<Item = (NodeId, GeometryId, usize, usize)> + '_ {
        self.walk().filter_map(|n| {
            let node = &self.nodes[n];
            let g = node.geometry()?;
            (node.count() > 0).then_some((n, g, node.start(), node.count()))
        })
    }

    /// Returns the material palette attached to the builder, if any
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("nodes", &self.nodes)
            .field("geometries", &self.geometries)
            .field("palette", &self.palette.is_some())
            .finish()
    }
}
