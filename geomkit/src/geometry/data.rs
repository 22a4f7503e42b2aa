use super::{Color4b, Field, Fields, LogicalVertex, is_null};
use crate::array::{GrowableArray, RawArray};
use nalgebra::{Vector2, Vector3};

/// Vertex data stored as parallel per-field arrays, plus optional indices
///
/// Fields are enabled as they are first appended.  Appending a
/// [`LogicalVertex`] keeps the arrays in lock-step: fields that the vertex
/// lacks are zero-filled, and fields that are new to the container are
/// back-filled with zeros for the earlier vertices.
///
/// The optional common normal applies to every vertex: when it is non-null,
/// [`vertex_at`](Self::vertex_at) reports it instead of any per-vertex normal.
/// The builder also uses it to pass a computed face normal from one triangle
/// to the next.
///
/// Cloning is cheap: every field array is copy-on-write.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryData {
    fields: Fields,
    positions: GrowableArray<Vector3<f32>>,
    normals: GrowableArray<Vector3<f32>>,
    tex_coords: GrowableArray<Vector2<f32>>,
    colors: GrowableArray<Color4b>,
    indices: RawArray<u32>,
    common_normal: Vector3<f32>,
}

impl Default for GeometryData {
    fn default() -> Self {
        Self {
            fields: Fields::empty(),
            positions: GrowableArray::new(),
            normals: GrowableArray::new(),
            tex_coords: GrowableArray::new(),
            colors: GrowableArray::new(),
            indices: RawArray::new(),
            common_normal: Vector3::zeros(),
        }
    }
}

impl GeometryData {
    /// Builds an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container from a list of positions
    pub fn from_positions<I: IntoIterator<Item = Vector3<f32>>>(
        positions: I,
    ) -> Self {
        let mut out = Self::new();
        for p in positions {
            out.append_vertex(p);
        }
        out
    }

    /// Returns the number of vertices
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Checks whether there are no vertices
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Returns the number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns the set of fields that have been enabled
    pub fn fields(&self) -> Fields {
        self.fields
    }

    /// Checks whether the given field has been enabled
    pub fn has_field(&self, f: Field) -> bool {
        self.fields.contains(f)
    }

    /// Returns the position array
    pub fn positions(&self) -> &GrowableArray<Vector3<f32>> {
        &self.positions
    }

    /// Returns the normal array
    pub fn normals(&self) -> &GrowableArray<Vector3<f32>> {
        &self.normals
    }

    /// Returns the texture coordinate array
    pub fn tex_coords(&self) -> &GrowableArray<Vector2<f32>> {
        &self.tex_coords
    }

    /// Returns the color array
    pub fn colors(&self) -> &GrowableArray<Color4b> {
        &self.colors
    }

    /// Returns the index array
    pub fn indices(&self) -> &RawArray<u32> {
        &self.indices
    }

    /// Returns the common normal (zero if unset)
    pub fn common_normal(&self) -> Vector3<f32> {
        self.common_normal
    }

    /// Sets the common normal; a zero vector clears it
    pub fn set_common_normal(&mut self, n: Vector3<f32>) {
        self.common_normal = n;
    }

    /// Appends a position
    pub fn append_vertex(&mut self, p: Vector3<f32>) {
        self.fields.insert(Field::Position);
        self.positions.append(p);
    }

    /// Appends a normal
    pub fn append_normal(&mut self, n: Vector3<f32>) {
        self.fields.insert(Field::Normal);
        self.normals.append(n);
    }

    /// Appends a texture coordinate
    pub fn append_tex_coord(&mut self, t: Vector2<f32>) {
        self.fields.insert(Field::TexCoord);
        self.tex_coords.append(t);
    }

    /// Appends a color
    pub fn append_color(&mut self, c: Color4b) {
        self.fields.insert(Field::Color);
        self.colors.append(c);
    }

    /// Appends a single index
    pub fn append_index(&mut self, i: u32) {
        self.indices.append(i);
    }

    /// Appends a slice of indices
    pub fn append_indices(&mut self, i: &[u32]) {
        self.indices.append_slice(i);
    }

    /// Enables a field, zero-filling it for existing vertices
    fn enable(&mut self, f: Field) {
        if self.fields.contains(f) {
            return;
        }
        self.fields.insert(f);
        let n = self.count();
        match f {
            Field::Position => (),
            Field::Normal => pad(&mut self.normals, n, Vector3::zeros()),
            Field::TexCoord => {
                pad(&mut self.tex_coords, n, Vector2::zeros())
            }
            Field::Color => pad(&mut self.colors, n, Color4b::default()),
        }
    }

    /// Appends a vertex with all of its attributes, returning its index
    pub fn append_logical_vertex(&mut self, v: &LogicalVertex) -> usize {
        for f in v.fields().iter() {
            self.enable(f);
        }
        let index = self.count();
        self.append_vertex(v.position);
        if self.has_field(Field::Normal) {
            self.normals.append(v.normal.unwrap_or_else(Vector3::zeros));
        }
        if self.has_field(Field::TexCoord) {
            self.tex_coords
                .append(v.tex_coord.unwrap_or_else(Vector2::zeros));
        }
        if self.has_field(Field::Color) {
            self.colors.append(v.color.unwrap_or_default());
        }
        index
    }

    /// Appends the vertices of another container
    ///
    /// If this container has no fields yet, it takes on all of `other`'s
    /// fields; otherwise only the fields present in both are appended.
    /// Indices and the common normal are not copied.
    pub fn append_geometry(&mut self, other: &GeometryData) {
        if self.fields.is_empty() {
            self.fields = other.fields;
        }
        let shared = self.fields.intersection(other.fields);
        for f in shared.iter() {
            match f {
                Field::Position => self.positions.append_array(&other.positions),
                Field::Normal => self.normals.append_array(&other.normals),
                Field::TexCoord => {
                    self.tex_coords.append_array(&other.tex_coords)
                }
                Field::Color => self.colors.append_array(&other.colors),
            }
        }
    }

    /// Returns the vertex at the given index, with all enabled attributes
    ///
    /// A non-null common normal takes precedence over per-vertex normals.
    ///
    /// # Panics
    /// If `i` is out of range
    pub fn vertex_at(&self, i: usize) -> LogicalVertex {
        let normal = if !is_null(&self.common_normal) {
            Some(self.common_normal)
        } else if self.has_field(Field::Normal) {
            self.normals.get(i).copied()
        } else {
            None
        };
        LogicalVertex {
            position: self.positions[i],
            normal,
            tex_coord: self.tex_coords.get(i).copied(),
            color: self.colors.get(i).copied(),
        }
    }

    /// Returns the vertex position at the given index
    pub fn position(&self, i: usize) -> Vector3<f32> {
        self.positions[i]
    }

    /// Returns the vertex normal at the given index
    pub fn normal(&self, i: usize) -> Vector3<f32> {
        self.normals[i]
    }

    /// Overwrites the normal of an existing vertex
    pub(crate) fn set_normal(&mut self, i: usize, n: Vector3<f32>) {
        self.normals[i] = n;
    }

    /// Returns vertices of `self` and `other` alternately
    ///
    /// The result holds `self[0], other[0], self[1], other[1], ...`, over the
    /// fields present in both containers and for as many pairs as the shorter
    /// container allows.  This is the layout used to stitch two outlines
    /// together with a quad strip.
    pub fn interleaved_with(&self, other: &GeometryData) -> GeometryData {
        let fields = self.fields.intersection(other.fields);
        let mut out = GeometryData {
            fields,
            ..Default::default()
        };
        let n = self.count().min(other.count());
        for i in 0..n {
            for src in [self, other] {
                for f in fields.iter() {
                    match f {
                        Field::Position => out.positions.append(src.positions[i]),
                        Field::Normal => out.normals.append(src.normals[i]),
                        Field::TexCoord => {
                            out.tex_coords.append(src.tex_coords[i])
                        }
                        Field::Color => out.colors.append(src.colors[i]),
                    }
                }
            }
        }
        out
    }

    /// Returns a copy with the vertex order reversed
    ///
    /// Indices are not carried over.
    pub fn reversed(&self) -> GeometryData {
        GeometryData {
            fields: self.fields,
            positions: self.positions.reversed(),
            normals: self.normals.reversed(),
            tex_coords: self.tex_coords.reversed(),
            colors: self.colors.reversed(),
            indices: RawArray::new(),
            common_normal: self.common_normal,
        }
    }

    /// Returns a copy with every position moved by `offset`
    pub fn translated(&self, offset: Vector3<f32>) -> GeometryData {
        let mut out = self.clone();
        for p in out.positions.as_mut_slice() {
            *p += offset;
        }
        out
    }

    /// Returns the average of all positions (zero if empty)
    pub fn center(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        let sum: Vector3<f32> = self.positions.iter().sum();
        sum / self.count() as f32
    }

    /// Returns the axis-aligned bounding box as `(min, max)`
    pub fn bounds(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    /// Rescales every non-zero normal to unit length
    pub fn normalize_normals(&mut self) {
        if !self.has_field(Field::Normal) {
            return;
        }
        for n in self.normals.as_mut_slice() {
            if !is_null(n) {
                n.normalize_mut();
            }
        }
    }
}

fn pad<T: Clone + 'static>(arr: &mut GrowableArray<T>, n: usize, v: T) {
    while arr.len() < n {
        arr.append(v.clone());
    }
}
