//! Vertex deduplication and normal smoothing
use super::{NodeId, Smoothing};
use crate::{
    array::RawArray,
    geometry::{
        FUZZ, Field, Fields, GeometryData, LogicalVertex, fuzzy_eq, fuzzy_eq3,
    },
};
use nalgebra::{Vector2, Vector3};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Normals accumulated across vertices sharing a position
///
/// Seam vertices (same position, different texture coordinate or color)
/// share a single group, so that the surface is smooth across the seam.
#[derive(Clone, Debug)]
struct SmoothGroup {
    members: Vec<usize>,
    seen: Vec<Vector3<f32>>,
    sum: Vector3<f32>,
}

/// An accumulation unit of indexed geometry with a single smoothing mode
///
/// Triangles appended to a section have their vertices merged with existing
/// vertices where possible, so that the resulting index array references each
/// distinct vertex once:
///
/// - vertices without a normal merge when their positions match (within
///   [`FUZZ`]) and their texture coordinates and colors are identical;
/// - in a [`Faceted`](Smoothing::Faceted) section, vertices with normals merge
///   only when their normals match too, so each face keeps its own normal;
/// - in a [`Smooth`](Smoothing::Smooth) section, vertices with normals merge
///   on position, and the incoming normal is added to the vertex normal
///   (each distinct normal is only counted once per vertex).
///
/// Small sections are searched linearly; once a section holds
/// `map_threshold` vertices, an ordered map keyed on the x coordinate is used
/// instead.
#[derive(Clone, Debug)]
pub struct Section {
    smoothing: Smoothing,
    map_threshold: usize,
    data: GeometryData,
    groups: Vec<SmoothGroup>,
    group_of: Vec<Option<usize>>,
    lookup: Option<BTreeMap<OrderedFloat<f32>, Vec<usize>>>,
    nodes: Vec<NodeId>,
}

impl Section {
    /// Builds a new empty section
    pub fn new(smoothing: Smoothing, map_threshold: usize) -> Self {
        Self {
            smoothing,
            map_threshold,
            data: GeometryData::new(),
            groups: vec![],
            group_of: vec![],
            lookup: None,
            nodes: vec![],
        }
    }

    /// Returns the smoothing mode
    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    /// Returns the vertex count at which lookups switch to an ordered map
    pub fn map_threshold(&self) -> usize {
        self.map_threshold
    }

    /// Sets the vertex count at which lookups switch to an ordered map
    pub fn set_map_threshold(&mut self, t: usize) {
        self.map_threshold = t;
        self.update_lookup();
    }

    /// Returns the number of distinct vertices
    pub fn count(&self) -> usize {
        self.data.count()
    }

    /// Returns the number of indices
    pub fn index_count(&self) -> usize {
        self.data.index_count()
    }

    /// Returns the set of vertex fields used by this section
    pub fn fields(&self) -> Fields {
        self.data.fields()
    }

    /// Returns the accumulated vertex data and indices
    pub fn data(&self) -> &GeometryData {
        &self.data
    }

    /// Returns the index array
    pub fn indices(&self) -> &RawArray<u32> {
        self.data.indices()
    }

    /// Returns the vertex at the given index
    pub fn vertex_at(&self, i: usize) -> LogicalVertex {
        self.data.vertex_at(i)
    }

    /// Returns the position of the given vertex
    pub fn position(&self, i: usize) -> Vector3<f32> {
        self.data.position(i)
    }

    /// Returns the (not yet normalized) normal of the given vertex
    pub fn normal(&self, i: usize) -> Vector3<f32> {
        self.data.normal(i)
    }

    /// Returns the top-level scene nodes referencing this section
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub(crate) fn add_node(&mut self, n: NodeId) {
        self.nodes.push(n);
    }

    /// Appends a triangle, merging vertices with existing ones
    pub fn append(
        &mut self,
        a: &LogicalVertex,
        b: &LogicalVertex,
        c: &LogicalVertex,
    ) {
        let i = self.append_one(a);
        let j = self.append_one(b);
        let k = self.append_one(c);
        self.data.append_index(i as u32);
        self.data.append_index(j as u32);
        self.data.append_index(k as u32);
    }

    /// Appends vertices and indices without any merging
    ///
    /// Indices are relative to `geom`, and are shifted past the vertices
    /// already in this section.
    pub(crate) fn append_raw(&mut self, geom: &GeometryData) {
        let offset = self.count() as u32;
        for i in 0..geom.count() {
            self.push(&geom.vertex_at(i), None);
        }
        let shifted: Vec<u32> =
            geom.indices().iter().map(|i| i + offset).collect();
        self.data.append_indices(&shifted);
    }

    /// Appends a single vertex, returning the index it should be drawn with
    fn append_one(&mut self, v: &LogicalVertex) -> usize {
        match (v.normal, self.smoothing) {
            (None, _) => self.append_flat(v),
            (Some(n), Smoothing::Faceted) => self.append_faceted(v, n),
            (Some(n), Smoothing::Smooth) => self.append_smooth(v, n),
        }
    }

    fn append_flat(&mut self, v: &LogicalVertex) -> usize {
        match self.find(&v.position, |i| self.attributes_match(i, v)) {
            Some(i) => i,
            None => self.push(v, None),
        }
    }

    fn append_faceted(&mut self, v: &LogicalVertex, n: Vector3<f32>) -> usize {
        let found = self.find(&v.position, |i| {
            self.data.has_field(Field::Normal)
                && fuzzy_eq3(&self.data.normal(i), &n)
                && self.attributes_match(i, v)
        });
        match found {
            Some(i) => i,
            None => self.push(v, None),
        }
    }

    fn append_smooth(&mut self, v: &LogicalVertex, n: Vector3<f32>) -> usize {
        if let Some(i) = self.find(&v.position, |i| {
            self.group_of[i].is_some() && self.attributes_match(i, v)
        }) {
            if let Some(g) = self.group_of[i] {
                self.accumulate(g, n);
            }
            return i;
        }

        // A vertex at the same place with different attributes becomes a
        // seam vertex, sharing normals with the existing one.
        let seam = self
            .find(&v.position, |i| self.group_of[i].is_some())
            .and_then(|i| self.group_of[i]);
        let g = match seam {
            Some(g) => g,
            None => {
                self.groups.push(SmoothGroup {
                    members: vec![],
                    seen: vec![],
                    sum: Vector3::zeros(),
                });
                self.groups.len() - 1
            }
        };
        let i = self.push(v, Some(g));
        self.groups[g].members.push(i);
        self.accumulate(g, n);
        i
    }

    /// Adds a normal to a smoothing group, unless it is already present
    fn accumulate(&mut self, g: usize, n: Vector3<f32>) {
        let group = &mut self.groups[g];
        if !group.seen.iter().any(|s| fuzzy_eq3(s, &n)) {
            group.seen.push(n);
            group.sum += n;
        }
        let sum = group.sum;
        for &m in &self.groups[g].members {
            self.data.set_normal(m, sum);
        }
    }

    /// Checks texture coordinate and color against an existing vertex
    ///
    /// Missing attributes compare as zero, matching the zero-fill used when
    /// the section stores them.
    fn attributes_match(&self, i: usize, v: &LogicalVertex) -> bool {
        let t = |t: Option<Vector2<f32>>| t.unwrap_or_else(Vector2::zeros);
        let have = self.data.vertex_at(i);
        t(have.tex_coord) == t(v.tex_coord)
            && have.color.unwrap_or_default() == v.color.unwrap_or_default()
    }

    /// Stores a new vertex, returning its index
    fn push(&mut self, v: &LogicalVertex, group: Option<usize>) -> usize {
        let i = self.data.append_logical_vertex(v);
        self.group_of.push(group);
        if let Some(map) = &mut self.lookup {
            map.entry(OrderedFloat(v.position.x)).or_default().push(i);
        } else {
            self.update_lookup();
        }
        i
    }

    /// Builds the ordered position map once the section is large enough
    fn update_lookup(&mut self) {
        if self.lookup.is_none() && self.count() >= self.map_threshold {
            let mut map: BTreeMap<_, Vec<usize>> = BTreeMap::new();
            for (i, p) in self.data.positions().iter().enumerate() {
                map.entry(OrderedFloat(p.x)).or_default().push(i);
            }
            self.lookup = Some(map);
        }
    }

    /// Finds the lowest-indexed vertex near `pos` which satisfies `pred`
    fn find<F: Fn(usize) -> bool>(
        &self,
        pos: &Vector3<f32>,
        pred: F,
    ) -> Option<usize> {
        let near = |i: usize| {
            let p = self.data.position(i);
            fuzzy_eq(p.y, pos.y) && fuzzy_eq(p.z, pos.z) && pred(i)
        };
        match &self.lookup {
            None => (0..self.count())
                .find(|&i| fuzzy_eq(self.data.position(i).x, pos.x) && near(i)),
            Some(map) => map
                .range(OrderedFloat(pos.x - FUZZ)..=OrderedFloat(pos.x + FUZZ))
                .flat_map(|(_, v)| v.iter().copied())
                .filter(|&i| near(i))
                .min(),
        }
    }

    /// Rescales accumulated normals to unit length
    pub(crate) fn normalize_normals(&mut self) {
        self.data.normalize_normals();
    }

    /// Checks whether any vertex has a null normal
    #[cfg(test)]
    fn has_null_normal(&self) -> bool {
        self.data.normals().iter().any(crate::geometry::is_null)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn v(x: f32, y: f32, z: f32) -> LogicalVertex {
        LogicalVertex::new(Vector3::new(x, y, z))
    }

    #[test]
    fn test_flat_dedup() {
        let mut s = Section::new(Smoothing::Smooth, 5);
        s.append(&v(0.0, 0.0, 0.0), &v(1.0, 0.0, 0.0), &v(1.0, 1.0, 0.0));
        s.append(&v(0.0, 0.0, 0.0), &v(1.0, 1.0, 0.0), &v(0.0, 1.0, 0.0));
        assert_eq!(s.count(), 4);
        assert_eq!(s.indices().as_slice(), &[0, 1, 2, 0, 2, 3]);
        assert!(!s.fields().contains(Field::Normal));

        // Fuzzy matching absorbs rounding noise
        s.append(
            &v(0.0, 0.0, 1e-6),
            &v(1.0 + 1e-6, 0.0, 0.0),
            &v(5.0, 5.0, 5.0),
        );
        assert_eq!(s.count(), 5);
        assert_eq!(&s.indices().as_slice()[6..], &[0, 1, 4]);
    }

    #[test]
    fn test_flat_attributes() {
        let mut s = Section::new(Smoothing::Smooth, 5);
        let t = Vector2::new(0.5, 0.5);
        s.append(
            &v(0.0, 0.0, 0.0),
            &v(1.0, 0.0, 0.0),
            &v(0.0, 1.0, 0.0).with_tex_coord(t),
        );
        s.append(
            &v(0.0, 1.0, 0.0),
            &v(1.0, 0.0, 0.0),
            &v(0.0, 1.0, 0.0).with_tex_coord(t),
        );
        assert_eq!(s.count(), 4);
        assert_eq!(&s.indices().as_slice()[3..], &[3, 1, 2]);
    }

    #[test]
    fn test_smooth() {
        let mut s = Section::new(Smoothing::Smooth, 5);
        let up = Vector3::z();
        let side = Vector3::x();
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(up),
            &v(1.0, 0.0, 0.0).with_normal(up),
            &v(0.0, 1.0, 0.0).with_normal(up),
        );
        assert_eq!(s.count(), 3);

        // Same normal again does not double up
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(up),
            &v(0.0, 1.0, 0.0).with_normal(up),
            &v(-1.0, 0.0, 0.0).with_normal(up),
        );
        assert_eq!(s.count(), 4);
        assert_eq!(s.normal(0), up);

        // A different normal is added in
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(side),
            &v(0.0, 0.0, 1.0).with_normal(side),
            &v(0.0, 1.0, 0.0).with_normal(side),
        );
        assert_eq!(s.count(), 5);
        assert_eq!(s.normal(0), up + side);
        assert_eq!(s.normal(2), up + side);
        assert_eq!(s.normal(1), up);

        s.normalize_normals();
        assert_relative_eq!(s.normal(0), (up + side).normalize());
        assert!(!s.has_null_normal());
    }

    #[test]
    fn test_smooth_seam() {
        let mut s = Section::new(Smoothing::Smooth, 5);
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(Vector3::z()).with_tex_coord(a),
            &v(1.0, 0.0, 0.0).with_normal(Vector3::z()).with_tex_coord(a),
            &v(0.0, 1.0, 0.0).with_normal(Vector3::z()).with_tex_coord(a),
        );
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(Vector3::x()).with_tex_coord(b),
            &v(0.0, 0.0, 1.0).with_normal(Vector3::x()).with_tex_coord(b),
            &v(0.0, 1.0, 0.0).with_normal(Vector3::x()).with_tex_coord(a),
        );
        // (0, 0, 0) is split by texture coordinate, (0, 1, 0) is merged
        assert_eq!(s.count(), 5);
        assert_eq!(&s.indices().as_slice()[3..], &[3, 4, 2]);
        let n = Vector3::z() + Vector3::x();
        assert_eq!(s.normal(0), n);
        assert_eq!(s.normal(3), n);
        assert_eq!(s.normal(2), n);
        assert_eq!(s.normal(4), Vector3::x());
    }

    #[test]
    fn test_faceted() {
        let mut s = Section::new(Smoothing::Faceted, 5);
        let up = Vector3::z();
        let side = Vector3::x();
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(up),
            &v(1.0, 0.0, 0.0).with_normal(up),
            &v(0.0, 1.0, 0.0).with_normal(up),
        );
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(up),
            &v(0.0, 1.0, 0.0).with_normal(up),
            &v(-1.0, 0.0, 0.0).with_normal(up),
        );
        assert_eq!(s.count(), 4);
        s.append(
            &v(0.0, 0.0, 0.0).with_normal(side),
            &v(0.0, 0.0, 1.0).with_normal(side),
            &v(0.0, 1.0, 0.0).with_normal(side),
        );
        assert_eq!(s.count(), 7);
        assert_eq!(s.normal(0), up);
        assert_eq!(s.normal(4), side);
    }

    #[test]
    fn test_map_matches_linear() {
        // The same geometry must index identically whichever lookup is used
        let mut linear = Section::new(Smoothing::Smooth, usize::MAX);
        let mut mapped = Section::new(Smoothing::Smooth, 0);
        for i in 0..20 {
            let x = (i % 5) as f32;
            let y = (i / 5) as f32;
            for s in [&mut linear, &mut mapped] {
                s.append(
                    &v(x, y, 0.0),
                    &v(x + 1.0, y, 0.0),
                    &v(x + 1.0, y + 1.0, 0.0),
                );
                s.append(
                    &v(x, y, 0.0),
                    &v(x + 1.0, y + 1.0, 0.0),
                    &v(x, y + 1.0, 0.0),
                );
            }
        }
        assert!(linear.lookup.is_none());
        assert!(mapped.lookup.is_some());
        assert_eq!(linear.count(), 6 * 5);
        assert_eq!(linear.indices(), mapped.indices());
        assert_eq!(linear.count(), mapped.count());
    }

    #[test]
    fn test_threshold_switch() {
        let mut s = Section::new(Smoothing::Smooth, 5);
        s.append(&v(0.0, 0.0, 0.0), &v(1.0, 0.0, 0.0), &v(1.0, 1.0, 0.0));
        assert!(s.lookup.is_none());
        s.append(&v(2.0, 0.0, 0.0), &v(3.0, 0.0, 0.0), &v(1.0, 1.0, 0.0));
        assert!(s.lookup.is_some());
        s.append(&v(2.0, 0.0, 0.0), &v(3.0, 0.0, 0.0), &v(0.0, 0.0, 0.0));
        assert_eq!(s.count(), 5);
        assert_eq!(&s.indices().as_slice()[6..], &[3, 4, 0]);
    }

    #[test]
    fn test_append_raw() {
        let mut s = Section::new(Smoothing::Smooth, 5);
        let mut g = GeometryData::from_positions([
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ]);
        g.append_indices(&[0, 1, 2]);
        s.append_raw(&g);
        s.append_raw(&g);
        assert_eq!(s.count(), 6);
        assert_eq!(s.indices().as_slice(), &[0, 1, 2, 3, 4, 5]);
    }
}
