//! Indexed triangle builder with automatic normals
//!
//! The [`GeometryBuilder`] accepts primitives (triangles, quads, fans, strips,
//! quad strips, triangulated faces and extruded outlines) as
//! [`GeometryData`], computes a lighting normal for every triangle that does
//! not carry one, merges identical vertices, and finally packs everything into
//! a [`Scene`].
//!
//! ```
//! use geomkit::{builder::GeometryBuilder, geometry::GeometryData};
//! use nalgebra::Vector3;
//!
//! let mut builder = GeometryBuilder::new();
//! builder.add_quads(&GeometryData::from_positions([
//!     Vector3::new(0.0, 0.0, 0.0),
//!     Vector3::new(1.0, 0.0, 0.0),
//!     Vector3::new(1.0, 1.0, 0.0),
//!     Vector3::new(0.0, 1.0, 0.0),
//! ]));
//! let scene = builder.finalized_scene_node().unwrap();
//! let (_, geom) = scene.geometries().next().unwrap();
//! assert_eq!(geom.count(), 4);
//! assert_eq!(geom.indices().as_slice(), &[0, 1, 2, 0, 2, 3]);
//! ```
//!
//! Triangles whose computed normal is null (collinear or coincident corners)
//! are skipped.  Triangles with an explicit normal, either per-vertex or as
//! the container's common normal, are always kept.
use crate::{
    geometry::{Field, Fields, GeometryData, is_null},
    indexed::IndexVec,
};
use log::{debug, warn};
use std::{any::Any, sync::Arc};

mod node;
mod output;
mod scene;
mod section;

pub use node::{GeometryId, NodeId, SceneNode};
pub use scene::{PackedGeometry, Scene, VertexBuffer};
pub use section::Section;

/// An opaque material palette, handed through to the finished [`Scene`]
pub type Palette = Arc<dyn Any + Send + Sync>;

/// Components of a computed normal at or below this magnitude become zero
const NULL_SNAP: f32 = 1e-5;

/// Scale applied to computed normals before the null test
const NORMAL_SCALE: f32 = 5.0;

/// Environment variable which enables warnings for dropped sections
pub const WARN_EMPTY_MESH_VAR: &str = "Q_WARN_EMPTY_MESH";

/// Normal handling for a section
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Smoothing {
    /// Vertices at the same position share a single averaged normal
    #[default]
    Smooth,
    /// Every face keeps its own normal, so edges look sharp
    Faceted,
}

/// Tuning knobs for a [`GeometryBuilder`]
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Vertex count at which sections switch from a linear scan to an ordered
    /// map when looking for duplicate vertices
    pub map_threshold: usize,

    /// Log a warning for each empty section dropped during finalization
    pub warn_empty_mesh: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_threshold: 5,
            warn_empty_mesh: false,
        }
    }
}

impl Settings {
    /// Builds default settings, enabling empty-section warnings if the
    /// `Q_WARN_EMPTY_MESH` environment variable is set to a non-empty value
    pub fn from_env() -> Self {
        let warn_empty_mesh = std::env::var_os(WARN_EMPTY_MESH_VAR)
            .is_some_and(|v| !v.is_empty());
        Self {
            warn_empty_mesh,
            ..Self::default()
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Builds indexed, normal-lit triangle geometry organized into scene nodes
///
/// Geometry is accumulated into [sections](Section), each with its own
/// [`Smoothing`] mode; scene nodes refer to index ranges within them.  The
/// builder is single use: [`finalized_scene_node`](Self::finalized_scene_node)
/// consumes its contents, and any further geometry is rejected.
pub struct GeometryBuilder {
    settings: Settings,
    sections: Vec<Section>,
    current_section: Option<usize>,
    nodes: IndexVec<SceneNode, NodeId>,
    root: NodeId,
    current_node: NodeId,
    stack: Vec<NodeId>,
    palette: Option<Palette>,
    finalized: bool,
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryBuilder {
    /// Builds a new builder, with settings from [`Settings::from_env`]
    pub fn new() -> Self {
        Self::with_settings(Settings::from_env())
    }

    /// Builds a new builder with the given settings
    pub fn with_settings(settings: Settings) -> Self {
        let mut nodes = IndexVec::default();
        let root = nodes.push(SceneNode::default());
        Self {
            settings,
            sections: vec![],
            current_section: None,
            nodes,
            root,
            current_node: root,
            stack: vec![],
            palette: None,
            finalized: false,
        }
    }

    /// Returns the active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sets the map threshold used by sections created from now on
    pub fn set_map_threshold(&mut self, t: usize) {
        self.settings.map_threshold = t;
    }

    /// Attaches a material palette, which is passed through to the scene
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = Some(palette);
    }

    /// Returns the attached material palette
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Returns the root scene node
    pub fn scene_node(&self) -> NodeId {
        self.root
    }

    /// Looks up a scene node
    pub fn node(&self, n: NodeId) -> &SceneNode {
        &self.nodes[n]
    }

    /// Looks up a scene node for editing (e.g. to name it)
    pub fn node_mut(&mut self, n: NodeId) -> &mut SceneNode {
        &mut self.nodes[n]
    }

    /// Returns all sections, in creation order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the section that receives new geometry
    pub fn current_section(&self) -> Option<&Section> {
        self.current_section.map(|i| &self.sections[i])
    }

    fn check_live(&self) {
        assert!(!self.finalized, "geometry builder was already finalized");
    }

    /// Returns the current section's index, creating a section if needed
    fn section_index(&mut self) -> usize {
        match self.current_section {
            Some(s) => s,
            None => {
                self.new_section(Smoothing::default());
                self.sections.len() - 1
            }
        }
    }

    /// Starts a new section, returning its first scene node
    ///
    /// The node stack is cleared, and the new node is a child of the root.
    pub fn new_section(&mut self, smoothing: Smoothing) -> NodeId {
        self.check_live();
        self.sections
            .push(Section::new(smoothing, self.settings.map_threshold));
        self.current_section = Some(self.sections.len() - 1);
        self.stack.clear();
        self.new_node()
    }

    /// Adds a node to the arena as the last child of `parent`
    fn add_child(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        let n = self.nodes.push(SceneNode {
            parent: Some(parent),
            ..node
        });
        self.nodes[parent].children.push(n);
        n
    }

    /// Creates a sibling of the current node and makes it current
    ///
    /// The new node starts drawing at the next index added.
    pub fn new_node(&mut self) -> NodeId {
        self.check_live();
        let Some(s) = self.current_section else {
            return self.new_section(Smoothing::default());
        };
        let parent = self.stack.last().copied().unwrap_or(self.root);
        let n = self.add_child(
            parent,
            SceneNode {
                start: self.sections[s].index_count(),
                section: Some(s),
                ..SceneNode::default()
            },
        );
        if self.stack.is_empty() {
            self.sections[s].add_node(n);
        }
        self.current_node = n;
        n
    }

    /// Returns the current node, creating a section if needed
    pub fn current_node(&mut self) -> NodeId {
        self.section_index();
        self.current_node
    }

    /// Saves the current node and creates a child of it
    pub fn push_node(&mut self) -> NodeId {
        self.check_live();
        let s = self.section_index();
        let parent = self.current_node;
        self.stack.push(parent);
        let n = self.add_child(
            parent,
            SceneNode {
                start: self.sections[s].index_count(),
                section: Some(s),
                ..SceneNode::default()
            },
        );
        self.current_node = n;
        n
    }

    /// Leaves the most recently pushed node
    ///
    /// A copy of the popped node is added at the popped node's level and
    /// made current.  The copy keeps the name and material, but has no
    /// children and draws from the next index onwards.  Returns `None` if
    /// nothing was pushed.
    pub fn pop_node(&mut self) -> Option<NodeId> {
        self.check_live();
        let s = self.section_index();
        let popped = self.stack.pop()?;
        let parent = self.stack.last().copied().unwrap_or(self.root);
        let n = self.add_child(
            parent,
            SceneNode {
                start: self.sections[s].index_count(),
                count: 0,
                section: Some(s),
                geometry: None,
                parent: None,
                children: vec![],
                ..self.nodes[popped].clone()
            },
        );
        if self.stack.is_empty() {
            self.sections[s].add_node(n);
        }
        self.current_node = n;
        Some(n)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Primitives

    /// Adds the triangle `(i, j, k)` from `data`
    ///
    /// If `data` has neither per-vertex normals nor a common normal, the face
    /// normal is computed, stored as the common normal (so that following
    /// triangles can reuse it), and the triangle is dropped if it is null.
    fn add_triangle(
        &mut self,
        i: usize,
        j: usize,
        k: usize,
        data: &mut GeometryData,
    ) {
        let s = self.section_index();
        let computed = !data.has_field(Field::Normal)
            && is_null(&data.common_normal());
        if computed {
            let (a, b, c) =
                (data.position(i), data.position(j), data.position(k));
            let mut n = (b - a).cross(&(c - b));
            for v in n.iter_mut() {
                if v.abs() <= NULL_SNAP {
                    *v = 0.0;
                }
            }
            n *= NORMAL_SCALE;
            if is_null(&n) {
                return;
            }
            data.set_common_normal(n);
        }
        let (a, b, c) = (data.vertex_at(i), data.vertex_at(j), data.vertex_at(k));
        self.sections[s].append(&a, &b, &c);
        self.nodes[self.current_node].count += 3;
    }

    /// Adds independent triangles
    ///
    /// If `triangles` carries indices, its vertices and indices are added
    /// as-is, without merging or normal generation.  Otherwise every three
    /// vertices form a triangle, and leftover vertices are ignored.
    pub fn add_triangles(&mut self, triangles: &GeometryData) {
        self.check_live();
        if triangles.index_count() > 0 {
            let s = self.section_index();
            self.sections[s].append_raw(triangles);
            self.nodes[self.current_node].count += triangles.index_count();
            return;
        }
        let mut t = triangles.clone();
        let save = t.common_normal();
        for i in (0..t.count().saturating_sub(2)).step_by(3) {
            self.add_triangle(i, i + 1, i + 2, &mut t);
            t.set_common_normal(save);
        }
    }

    /// Adds quads, each of four vertices `(a, b, c, d)`, as the triangles
    /// `(a, b, c)` and `(a, c, d)` sharing one normal
    pub fn add_quads(&mut self, quads: &GeometryData) {
        self.check_live();
        let mut q = quads.clone();
        let save = q.common_normal();
        for i in (0..q.count().saturating_sub(3)).step_by(4) {
            self.add_triangle(i, i + 1, i + 2, &mut q);
            self.add_triangle(i, i + 2, i + 3, &mut q);
            q.set_common_normal(save);
        }
    }

    /// Adds a triangle fan around the first vertex
    pub fn add_triangle_fan(&mut self, fan: &GeometryData) {
        self.check_live();
        let mut f = fan.clone();
        let save = f.common_normal();
        for i in 1..f.count().saturating_sub(1) {
            self.add_triangle(0, i, i + 1, &mut f);
            f.set_common_normal(save);
        }
    }

    /// Adds a triangle strip, alternating winding to keep faces consistent
    pub fn add_triangle_strip(&mut self, strip: &GeometryData) {
        self.check_live();
        let mut s = strip.clone();
        let save = s.common_normal();
        for i in 0..s.count().saturating_sub(2) {
            if i % 2 == 0 {
                self.add_triangle(i, i + 1, i + 2, &mut s);
            } else {
                self.add_triangle(i + 1, i, i + 2, &mut s);
            }
            s.set_common_normal(save);
        }
    }

    /// Adds a quad strip
    ///
    /// Vertices come in pairs along the strip; each step of two vertices
    /// adds the quad `(i, i + 2, i + 3, i + 1)`.
    pub fn add_quad_strip(&mut self, strip: &GeometryData) {
        self.check_live();
        let mut s = strip.clone();
        let save = s.common_normal();
        for i in (0..s.count().saturating_sub(3)).step_by(2) {
            self.add_triangle(i, i + 2, i + 3, &mut s);
            self.add_triangle(i, i + 3, i + 1, &mut s);
            s.set_common_normal(save);
        }
    }

    /// Adds a face around a center vertex
    ///
    /// The first vertex is the center, and the rest form a closed outline:
    /// unlike [`add_triangle_fan`](Self::add_triangle_fan), a final triangle
    /// joins the last outline vertex back to the first.  The outline may be
    /// concave as long as every corner is visible from the center.
    ///
    /// Only the vertex attributes are used; the face normal is taken from the
    /// first non-degenerate triangle.
    pub fn add_triangulated_face(&mut self, face: &GeometryData) {
        self.check_live();
        let mut f = GeometryData::new();
        f.append_geometry(face);
        let count = f.count();
        if count > 1 {
            for i in 1..count {
                let n = if i + 1 == count { 1 } else { i + 1 };
                self.add_triangle(0, i, n, &mut f);
            }
        }
    }

    /// Adds the side walls between two outlines
    ///
    /// `top` and `bottom` are walked in lock-step, and each pair of
    /// consecutive vertices becomes a quad; this is typically used to extrude
    /// a shape.  The walls use the sum of both common normals if it is
    /// non-null, and computed normals otherwise.
    pub fn add_quads_interleaved(
        &mut self,
        top: &GeometryData,
        bottom: &GeometryData,
    ) {
        self.check_live();
        let mut zipped = bottom.interleaved_with(top);
        let norm = top.common_normal() + bottom.common_normal();
        zipped.set_common_normal(norm);
        for i in (0..zipped.count().saturating_sub(2)).step_by(2) {
            self.add_triangle(i, i + 2, i + 3, &mut zipped);
            self.add_triangle(i, i + 3, i + 1, &mut zipped);
            zipped.set_common_normal(norm);
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Finalization

    /// Sum of node counts across a subtree
    fn recursive_count(&self, n: NodeId) -> usize {
        let node = &self.nodes[n];
        node.count
            + node
                .children
                .iter()
                .map(|c| self.recursive_count(*c))
                .sum::<usize>()
    }

    /// Shifts a subtree into its packed geometry, marking empty unnamed
    /// nodes for deletion; returns the subtree's total count
    fn adjust_node_tree(
        &mut self,
        n: NodeId,
        offset: usize,
        geometry: Option<GeometryId>,
        deleted: &mut [bool],
    ) -> usize {
        let node = &mut self.nodes[n];
        node.start += offset;
        node.geometry = geometry;
        let mut total = node.count;
        for c in node.children.clone() {
            total += self.adjust_node_tree(c, offset, geometry, deleted);
        }
        if total == 0 && self.nodes[n].name.is_empty() {
            self.mark_deleted(n, deleted);
        }
        total
    }

    fn mark_deleted(&self, n: NodeId, deleted: &mut [bool]) {
        use crate::indexed::Index;
        deleted[n.get()] = true;
        for c in &self.nodes[n].children {
            self.mark_deleted(*c, deleted);
        }
    }

    /// Packs all sections into a finished [`Scene`]
    ///
    /// Sections without vertices, indices or drawn nodes are dropped (with a
    /// warning if [`Settings::warn_empty_mesh`] is set).  Sections with the
    /// same field set are concatenated into a single [`PackedGeometry`], and
    /// nodes are rebased onto it.  Nodes which draw nothing (including their
    /// children) are removed, unless they are named.
    ///
    /// This may only be called once; subsequent calls log a warning and
    /// return `None`.
    pub fn finalized_scene_node(&mut self) -> Option<Scene> {
        if self.finalized {
            warn!("finalized_scene_node called twice");
            return None;
        }
        self.finalized = true;

        let sections = std::mem::take(&mut self.sections);
        let mut packed: Vec<(Fields, GeometryData)> = vec![];
        let mut placement = vec![];
        for (i, mut s) in sections.into_iter().enumerate() {
            let drawn: usize =
                s.nodes().iter().map(|n| self.recursive_count(*n)).sum();
            if s.count() == 0 || s.index_count() == 0 || drawn == 0 {
                if self.settings.warn_empty_mesh {
                    let reason = if drawn == 0 {
                        "nodes empty"
                    } else if s.count() == 0 {
                        "geometry count zero"
                    } else {
                        "index count zero"
                    };
                    warn!(
                        "ignoring section {i} with {} vertices and {} \
                         indices: {reason}",
                        s.count(),
                        s.index_count()
                    );
                }
                placement.push((s, None, 0));
                continue;
            }
            s.normalize_normals();
            let fields = s.fields();
            match packed.iter().position(|(f, _)| *f == fields) {
                Some(g) => {
                    let gd = &mut packed[g].1;
                    let vertex_offset = gd.count() as u32;
                    let index_offset = gd.index_count();
                    gd.append_geometry(s.data());
                    let indices: Vec<u32> = s
                        .indices()
                        .iter()
                        .map(|i| i + vertex_offset)
                        .collect();
                    gd.append_indices(&indices);
                    placement.push((s, Some(g), index_offset));
                }
                None => {
                    packed.push((fields, s.data().clone()));
                    placement.push((s, Some(packed.len() - 1), 0));
                }
            }
        }
        debug!(
            "packed {} sections into {} geometries",
            placement.len(),
            packed.len()
        );

        use crate::indexed::Index;
        let mut deleted = vec![false; self.nodes.len()];
        for (s, g, offset) in &placement {
            let g = g.map(GeometryId::new);
            for n in s.nodes() {
                self.adjust_node_tree(*n, *offset, g, &mut deleted);
            }
        }

        // Compact the arena, keeping the relative order of surviving nodes
        let nodes = std::mem::take(&mut self.nodes);
        let mut remap = vec![None; nodes.len()];
        let mut next = 0;
        for (i, r) in remap.iter_mut().enumerate() {
            if !deleted[i] {
                *r = Some(NodeId::new(next));
                next += 1;
            }
        }
        let remap_id = |n: NodeId| remap[n.get()];
        let nodes: IndexVec<SceneNode, NodeId> = nodes
            .iter()
            .filter(|(n, _)| !deleted[n.get()])
            .map(|(_, node)| SceneNode {
                parent: node.parent.and_then(remap_id),
                children: node
                    .children
                    .iter()
                    .filter_map(|c| remap_id(*c))
                    .collect(),
                ..node.clone()
            })
            .collect();
        let root = remap_id(self.root).unwrap_or(self.root);

        Some(Scene {
            nodes,
            root,
            geometries: packed
                .into_iter()
                .map(|(_, g)| PackedGeometry(g))
                .collect(),
            palette: self.palette.clone(),
        })
    }
}

impl Drop for GeometryBuilder {
    fn drop(&mut self) {
        if !self.finalized && !self.sections.is_empty() {
            warn!("geometry builder dropped without being finalized");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{geometry::LogicalVertex, indexed::Index};
    use approx::assert_relative_eq;
    use nalgebra::{Vector2, Vector3};

    fn data(points: &[[f32; 3]]) -> GeometryData {
        GeometryData::from_positions(points.iter().map(|p| Vector3::from(*p)))
    }

    fn builder() -> GeometryBuilder {
        GeometryBuilder::with_settings(Settings::default())
    }

    fn section_indices(b: &GeometryBuilder) -> Vec<u32> {
        b.current_section().unwrap().indices().to_vec()
    }

    const SQUARE: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];

    /// A center point and four points around it
    const STAR: [[f32; 3]; 5] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, -1.0, 0.0],
    ];

    #[test]
    fn test_normal_convention() {
        let mut b = builder();
        b.add_triangles(&data(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ]));
        let s = b.current_section().unwrap();
        assert_eq!(s.count(), 3);
        assert_eq!(s.normal(0), Vector3::new(0.0, 0.0, NORMAL_SCALE));

        let scene = b.finalized_scene_node().unwrap();
        let (_, g) = scene.geometries().next().unwrap();
        for n in g.normals().iter() {
            assert_relative_eq!(*n, Vector3::z());
        }
    }

    #[test]
    fn test_degenerate_triangles() {
        let mut b = builder();
        let node = b.current_node();
        let line = data(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        b.add_triangles(&line);
        let point = data(&[[1.0, 1.0, 1.0]; 3]);
        b.add_triangles(&point);
        let tiny = data(&[[0.0, 0.0, 0.0], [1e-3, 0.0, 0.0], [0.0, 1e-3, 0.0]]);
        b.add_triangles(&tiny);
        assert_eq!(b.current_section().unwrap().count(), 0);
        assert_eq!(b.current_section().unwrap().index_count(), 0);
        assert_eq!(b.node(node).count(), 0);

        // An explicit normal keeps the triangle
        let mut line = line;
        for _ in 0..3 {
            line.append_normal(Vector3::z());
        }
        b.add_triangles(&line);
        assert_eq!(b.current_section().unwrap().count(), 3);
        assert_eq!(b.node(node).count(), 3);

        // So does a common normal
        let mut point = point;
        point.set_common_normal(Vector3::y());
        b.add_triangles(&point);
        assert_eq!(b.node(node).count(), 6);
    }

    #[test]
    fn test_leftover_vertices() {
        let mut b = builder();
        let mut d = data(&SQUARE);
        d.append_vertex(Vector3::new(5.0, 5.0, 0.0));
        b.add_triangles(&d);
        assert_eq!(section_indices(&b), [0, 1, 2]);
    }

    #[test]
    fn test_quad() {
        let mut b = builder();
        b.add_quads(&data(&SQUARE));
        assert_eq!(b.current_section().unwrap().count(), 4);
        assert_eq!(section_indices(&b), [0, 1, 2, 0, 2, 3]);

        // Incomplete quads are ignored
        let mut b = builder();
        b.add_quads(&data(&SQUARE[..3]));
        assert!(b.current_section().is_none());
    }

    #[test]
    fn test_fan() {
        let mut b = builder();
        b.add_triangle_fan(&data(&STAR));
        assert_eq!(section_indices(&b), [0, 1, 2, 0, 2, 3, 0, 3, 4]);

        let mut b = builder();
        b.add_triangle_fan(&data(&STAR[..2]));
        assert!(b.current_section().is_none());
    }

    #[test]
    fn test_strip() {
        let mut b = builder();
        b.add_triangle_strip(&data(&[
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
        ]));
        assert_eq!(section_indices(&b), [0, 1, 2, 2, 1, 3, 2, 3, 4]);
        let s = b.current_section().unwrap();
        assert_eq!(s.count(), 5);
        assert_eq!(s.normal(1), Vector3::new(0.0, 0.0, -NORMAL_SCALE));
    }

    #[test]
    fn test_triangulated_face() {
        let mut b = builder();
        b.add_triangulated_face(&data(&STAR));
        assert_eq!(
            section_indices(&b),
            [0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1]
        );
        assert_eq!(b.node(b.current_node).count(), 12);
    }

    #[test]
    fn test_quad_strip() {
        let mut b = builder();
        b.add_quad_strip(&data(&[
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
        ]));
        assert_eq!(
            section_indices(&b),
            [0, 1, 2, 0, 2, 3, 1, 4, 5, 1, 5, 2]
        );
    }

    #[test]
    fn test_quads_interleaved() {
        let bottom = data(&SQUARE);
        let top = bottom.translated(Vector3::z());

        let mut b = builder();
        b.new_section(Smoothing::Faceted);
        b.add_quads_interleaved(&top, &bottom);
        let s = b.current_section().unwrap();
        assert_eq!(s.index_count(), 18);
        assert_eq!(s.count(), 12);
        assert_eq!(s.normal(0), Vector3::new(0.0, -NORMAL_SCALE, 0.0));

        let mut b = builder();
        b.add_quads_interleaved(&top, &bottom);
        assert_eq!(b.current_section().unwrap().count(), 8);

        // A common normal is used for every wall
        let mut b = builder();
        b.new_section(Smoothing::Faceted);
        let mut top = top;
        top.set_common_normal(Vector3::x());
        b.add_quads_interleaved(&top, &bottom);
        assert_eq!(b.current_section().unwrap().count(), 8);
    }

    #[test]
    fn test_raw_triangles() {
        let mut b = builder();
        let mut d = data(&SQUARE);
        d.append_indices(&[0, 1, 2, 0, 2, 3]);
        b.add_triangles(&d);
        b.add_triangles(&d);
        let s = b.current_section().unwrap();
        assert_eq!(s.count(), 8);
        assert_eq!(
            s.indices().as_slice(),
            &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]
        );
        assert!(!s.fields().contains(Field::Normal));
        assert_eq!(b.node(b.current_node).count(), 12);
    }

    #[test]
    fn test_finalize_once() {
        let mut b = builder();
        b.add_quads(&data(&SQUARE));
        let scene = b.finalized_scene_node();
        assert!(scene.is_some());
        assert!(b.finalized_scene_node().is_none());
    }

    #[test]
    #[should_panic]
    fn test_add_after_finalize() {
        let mut b = builder();
        b.add_quads(&data(&SQUARE));
        b.finalized_scene_node();
        b.add_quads(&data(&SQUARE));
    }

    #[test]
    fn test_push_pop() {
        let mut b = builder();
        let a = b.new_section(Smoothing::Smooth);
        b.node_mut(a).set_material(Some(2));
        b.node_mut(a).set_name("arm");
        b.add_quads(&data(&SQUARE));
        let child = b.push_node();
        assert_eq!(b.node(child).parent(), Some(a));
        assert_eq!(b.node(child).start(), 6);
        b.add_quads(&data(&SQUARE).translated(Vector3::z()));
        let again = b.pop_node().unwrap();
        assert_eq!(b.node(again).parent(), Some(b.scene_node()));
        assert_eq!(b.node(again).name(), "arm");
        assert_eq!(b.node(again).material(), Some(2));
        assert!(b.node(again).children().is_empty());
        assert_eq!(b.node(again).start(), 12);
        assert_eq!(b.node(again).count(), 0);
        b.add_triangles(&data(&SQUARE[..3]).translated(Vector3::x() * 3.0));
        assert!(b.pop_node().is_none());
        assert_eq!(b.current_section().unwrap().nodes(), &[a, again]);

        let scene = b.finalized_scene_node().unwrap();
        assert_eq!(scene.node_count(), 4);
        let root = scene.root();
        assert_eq!(scene.children(root), &[a, again]);
        assert_eq!(scene.children(a), &[child]);
        assert_eq!(scene.node(child).start(), 6);
        assert_eq!(scene.node(child).count(), 6);
        assert_eq!(scene.node(again).start(), 12);
        assert_eq!(scene.node(again).count(), 3);
        assert!(scene.geometry_of(child).is_some());
        assert!(scene.geometry_of(root).is_none());
        let ranges: Vec<_> =
            scene.draw_ranges().map(|(n, _, s, c)| (n, s, c)).collect();
        assert_eq!(ranges, [(a, 0, 6), (child, 6, 6), (again, 12, 3)]);
    }

    #[test]
    fn test_pop_keeps_named_copy() {
        let mut b = builder();
        let a = b.new_section(Smoothing::Smooth);
        b.add_quads(&data(&SQUARE));
        let arm = b.push_node();
        b.node_mut(arm).set_name("arm");
        b.add_quads(&data(&SQUARE).translated(Vector3::z()));
        let hand = b.push_node();
        b.add_quads(&data(&SQUARE).translated(Vector3::z() * 2.0));
        let copy = b.pop_node().unwrap();
        assert_eq!(b.node(copy).name(), "arm");
        assert_eq!(b.node(copy).parent(), Some(a));
        assert_eq!(b.node(copy).start(), 18);

        // The copy draws nothing, but its name keeps it in the scene
        let scene = b.finalized_scene_node().unwrap();
        assert_eq!(scene.node_count(), 5);
        assert_eq!(scene.children(a), &[arm, copy]);
        assert_eq!(scene.children(arm), &[hand]);
        assert_eq!(scene.node(copy).name(), "arm");
        assert_eq!(scene.node(copy).count(), 0);
        assert_eq!(scene.find("arm"), Some(arm));
    }

    #[test]
    fn test_warn_empty_mesh_env() {
        // SAFETY: no other test reads or writes this variable concurrently
        unsafe { std::env::set_var(WARN_EMPTY_MESH_VAR, "1") };
        assert!(Settings::from_env().warn_empty_mesh);
        assert!(GeometryBuilder::new().settings().warn_empty_mesh);

        unsafe { std::env::set_var(WARN_EMPTY_MESH_VAR, "") };
        assert!(!Settings::from_env().warn_empty_mesh);

        unsafe { std::env::remove_var(WARN_EMPTY_MESH_VAR) };
        assert!(!Settings::from_env().warn_empty_mesh);
    }

    #[test]
    fn test_drop_empty_section() {
        let mut b = GeometryBuilder::with_settings(Settings {
            warn_empty_mesh: true,
            ..Settings::default()
        });
        let a = b.new_section(Smoothing::Smooth);
        b.add_quads(&data(&SQUARE));
        let anchor = b.new_section(Smoothing::Faceted);
        b.node_mut(anchor).set_name("anchor");
        let unnamed = b.new_node();
        assert_eq!(b.sections().len(), 2);
        assert_eq!(b.sections()[1].count(), 0);

        let scene = b.finalized_scene_node().unwrap();
        assert_eq!(scene.geometry_count(), 1);
        assert_eq!(scene.node_count(), 3);
        assert_eq!(unnamed.get(), 3);

        let root = scene.root();
        assert_eq!(scene.children(root), &[a, anchor]);
        assert_eq!(scene.node(anchor).parent(), Some(root));
        assert_eq!(scene.node(anchor).geometry(), None);
        assert!(scene.geometry_of(anchor).is_none());
        assert!(scene.geometry_of(a).is_some());
        let ranges: Vec<_> =
            scene.draw_ranges().map(|(n, _, s, c)| (n, s, c)).collect();
        assert_eq!(ranges, [(a, 0, 6)]);
    }

    #[test]
    fn test_prune_empty_nodes() {
        let mut b = builder();
        let a = b.new_section(Smoothing::Smooth);
        b.add_quads(&data(&SQUARE));
        let empty = b.new_node();
        let anchor = b.new_node();
        b.node_mut(anchor).set_name("anchor");
        b.new_section(Smoothing::Faceted);
        b.new_node();
        assert_eq!(b.sections().len(), 2);

        let scene = b.finalized_scene_node().unwrap();
        assert_eq!(scene.node_count(), 3);
        assert_eq!(empty.get(), 2);
        let anchor = scene.find("anchor").unwrap();
        assert_eq!(scene.children(scene.root()), &[a, anchor]);
        assert_eq!(scene.node(anchor).start(), 6);
        assert!(scene.geometry_of(anchor).is_some());
        assert!(scene.find("missing").is_none());
    }

    #[test]
    fn test_section_packing() {
        let mut b = builder();
        let first = b.new_section(Smoothing::Smooth);
        b.add_quads(&data(&SQUARE));
        let second = b.new_section(Smoothing::Faceted);
        b.add_triangles(&data(&SQUARE[..3]).translated(Vector3::z()));

        // Texture coordinates give a different field set
        let third = b.new_section(Smoothing::Smooth);
        let mut textured = GeometryData::new();
        for p in &SQUARE[..3] {
            textured.append_logical_vertex(
                &LogicalVertex::new(Vector3::from(*p))
                    .with_tex_coord(Vector2::new(p[0], p[1])),
            );
        }
        b.add_triangles(&textured);

        let scene = b.finalized_scene_node().unwrap();
        assert_eq!(scene.geometry_count(), 2);
        assert_eq!(scene.node(first).geometry(), scene.node(second).geometry());
        assert_ne!(scene.node(first).geometry(), scene.node(third).geometry());
        assert_eq!(scene.node(second).start(), 6);
        assert_eq!(scene.node(third).start(), 0);

        let g = scene.geometry_of(second).unwrap();
        assert_eq!(g.count(), 7);
        assert_eq!(
            g.indices().as_slice(),
            &[0, 1, 2, 0, 2, 3, 4, 5, 6]
        );
        let g = scene.geometry_of(third).unwrap();
        assert!(g.has_field(Field::TexCoord));
        assert_eq!(g.count(), 3);
    }

    #[test]
    fn test_palette() {
        let mut b = builder();
        b.set_palette(Arc::new(vec!["red", "green"]));
        b.add_quads(&data(&SQUARE));
        let scene = b.finalized_scene_node().unwrap();
        let p = scene.palette().unwrap();
        assert_eq!(p.downcast_ref::<Vec<&str>>().unwrap()[1], "green");
    }

    #[test]
    fn test_settings() {
        let s = Settings::default();
        assert_eq!(s.map_threshold, 5);
        assert!(!s.warn_empty_mesh);

        let mut b = GeometryBuilder::with_settings(Settings {
            map_threshold: 100,
            warn_empty_mesh: true,
        });
        b.new_section(Smoothing::Smooth);
        assert_eq!(b.current_section().unwrap().map_threshold(), 100);
        b.set_map_threshold(7);
        b.new_section(Smoothing::Smooth);
        assert_eq!(b.current_section().unwrap().map_threshold(), 7);
        assert_eq!(b.sections()[0].map_threshold(), 100);

        // Empty sections are dropped without fuss
        let scene = b.finalized_scene_node().unwrap();
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.geometry_count(), 0);
    }
}
