//! Vertex attribute types and the [`GeometryData`] input container
//!
//! A [`LogicalVertex`] is one vertex with all of its attributes; a
//! [`GeometryData`] stores many vertices as parallel per-attribute arrays,
//! which is the form that the [`GeometryBuilder`](crate::builder::GeometryBuilder)
//! consumes.
use nalgebra::{Vector2, Vector3};
use zerocopy::{FromBytes, Immutable, IntoBytes};

mod data;
pub use data::GeometryData;

/// Tolerance used when comparing positions and normals
pub const FUZZ: f32 = 1e-5;

/// Checks whether two values are equal within [`FUZZ`]
pub fn fuzzy_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= FUZZ
}

/// Checks whether two vectors are component-wise equal within [`FUZZ`]
pub fn fuzzy_eq3(a: &Vector3<f32>, b: &Vector3<f32>) -> bool {
    a.iter().zip(b.iter()).all(|(a, b)| fuzzy_eq(*a, *b))
}

/// Checks whether every component of a vector is exactly zero
pub fn is_null(v: &Vector3<f32>) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

////////////////////////////////////////////////////////////////////////////////

/// A single per-vertex attribute
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    strum::EnumIter,
    strum::EnumCount,
    strum::Display,
    enum_map::Enum,
)]
pub enum Field {
    /// Vertex position (3 floats)
    Position,
    /// Lighting normal (3 floats)
    Normal,
    /// Texture coordinate (2 floats)
    TexCoord,
    /// RGBA color (4 bytes, expanded to 4 floats in vertex buffers)
    Color,
}

impl Field {
    /// Number of `f32` components used by this field in a vertex buffer
    pub fn components(self) -> usize {
        match self {
            Field::Position | Field::Normal => 3,
            Field::TexCoord => 2,
            Field::Color => 4,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A set of [`Field`] values, stored as a bitmask
///
/// Sections are packed together when their field sets are identical, so this
/// type is also used as the "vertex signature" of packed geometry.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Fields(u8);

impl Fields {
    /// Builds an empty field set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Checks whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Checks whether the given field is present
    pub fn contains(&self, f: Field) -> bool {
        self.0 & f.bit() != 0
    }

    /// Adds a field to the set
    pub fn insert(&mut self, f: Field) {
        self.0 |= f.bit();
    }

    /// Returns the set with the given field added
    pub fn with(mut self, f: Field) -> Self {
        self.insert(f);
        self
    }

    /// Returns the fields present in both sets
    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns the fields present in either set
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Iterates over fields in the set, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        use strum::IntoEnumIterator;
        Field::iter().filter(|f| self.contains(*f))
    }
}

impl From<Field> for Fields {
    fn from(f: Field) -> Self {
        Self(f.bit())
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        iter.into_iter().fold(Fields::empty(), Fields::with)
    }
}

impl std::fmt::Debug for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// An RGBA color with one byte per channel
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    IntoBytes,
    FromBytes,
    Immutable,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Color4b {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}
static_assertions::assert_eq_size!(Color4b, [u8; 4]);

impl Color4b {
    /// Builds a new color
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the channels scaled to the `0.0..=1.0` range
    pub fn to_f32s(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a].map(|c| f32::from(c) / 255.0)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// A single vertex with all of its attributes
///
/// Only the position is mandatory.  Equality is exact; fuzzy matching is
/// left to the section that stores vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LogicalVertex {
    /// Vertex position
    pub position: Vector3<f32>,
    /// Lighting normal
    pub normal: Option<Vector3<f32>>,
    /// Texture coordinate
    pub tex_coord: Option<Vector2<f32>>,
    /// Vertex color
    pub color: Option<Color4b>,
}

impl LogicalVertex {
    /// Builds a vertex with only a position
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            position,
            normal: None,
            tex_coord: None,
            color: None,
        }
    }

    /// Returns a copy of this vertex with the given normal
    pub fn with_normal(mut self, normal: Vector3<f32>) -> Self {
        self.normal = Some(normal);
        self
    }

    /// Returns a copy of this vertex with the given texture coordinate
    pub fn with_tex_coord(mut self, t: Vector2<f32>) -> Self {
        self.tex_coord = Some(t);
        self
    }

    /// Returns a copy of this vertex with the given color
    pub fn with_color(mut self, c: Color4b) -> Self {
        self.color = Some(c);
        self
    }

    /// Returns the set of fields that are present in this vertex
    pub fn fields(&self) -> Fields {
        let mut out = Fields::from(Field::Position);
        if self.normal.is_some() {
            out.insert(Field::Normal);
        }
        if self.tex_coord.is_some() {
            out.insert(Field::TexCoord);
        }
        if self.color.is_some() {
            out.insert(Field::Color);
        }
        out
    }
}

impl From<Vector3<f32>> for LogicalVertex {
    fn from(position: Vector3<f32>) -> Self {
        Self::new(position)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fields() {
        let f = Fields::from(Field::Position).with(Field::Color);
        assert!(f.contains(Field::Position));
        assert!(!f.contains(Field::Normal));
        assert_eq!(f.iter().collect::<Vec<_>>(), [Field::Position, Field::Color]);

        let g: Fields = [Field::Color, Field::TexCoord].into_iter().collect();
        assert_eq!(f.intersection(g), Fields::from(Field::Color));
        assert_eq!(f.union(g).iter().count(), 3);
        assert!(Fields::empty().is_empty());
    }

    #[test]
    fn test_logical_vertex_fields() {
        let v = LogicalVertex::new(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(v.fields(), Fields::from(Field::Position));
        let v = v
            .with_normal(Vector3::z())
            .with_color(Color4b::new(255, 0, 0, 255));
        assert!(v.fields().contains(Field::Normal));
        assert!(v.fields().contains(Field::Color));
        assert!(!v.fields().contains(Field::TexCoord));
    }

    #[test]
    fn test_fuzzy() {
        assert!(fuzzy_eq(1.0, 1.0 + 5e-6));
        assert!(!fuzzy_eq(1.0, 1.001));
        assert!(fuzzy_eq3(
            &Vector3::new(0.0, 1.0, 2.0),
            &Vector3::new(1e-6, 1.0, 2.0)
        ));
        assert!(is_null(&Vector3::zeros()));
        assert!(!is_null(&Vector3::new(0.0, 1e-9, 0.0)));
    }

    #[test]
    fn test_color() {
        let c = Color4b::new(255, 0, 51, 255);
        assert_eq!(c.to_f32s(), [1.0, 0.0, 0.2, 1.0]);
        assert_eq!(c.as_bytes(), &[255, 0, 51, 255]);
    }
}
