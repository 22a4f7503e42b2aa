//! geomkit is a library for building indexed triangle geometry.
//!
//! It is split into three layers:
//!
//! - [`array`] provides copy-on-write arrays with inline small-buffer storage.
//!   Copies share a single heap block until one of them is modified, which
//!   makes it cheap to pass vertex data around by value.
//! - [`geometry`] stores vertices as parallel per-attribute arrays
//!   ([`GeometryData`](geometry::GeometryData)), along with the
//!   [`LogicalVertex`](geometry::LogicalVertex) view of a single vertex.
//! - [`builder`] turns primitives into deduplicated, indexed geometry with
//!   lighting normals, organized into a tree of scene nodes.
//!
//! # Building a shape
//! Primitives are added to a [`GeometryBuilder`](builder::GeometryBuilder),
//! which computes a face normal for each triangle, merges shared vertices,
//! and finally packs everything into a [`Scene`](builder::Scene):
//!
//! ```
//! use geomkit::{
//!     builder::{GeometryBuilder, Smoothing},
//!     geometry::GeometryData,
//! };
//! use nalgebra::Vector3;
//!
//! let mut builder = GeometryBuilder::new();
//! builder.new_section(Smoothing::Faceted);
//!
//! // A square, as two triangles sharing an edge
//! let square = GeometryData::from_positions([
//!     Vector3::new(0.0, 0.0, 0.0),
//!     Vector3::new(1.0, 0.0, 0.0),
//!     Vector3::new(1.0, 1.0, 0.0),
//!     Vector3::new(0.0, 1.0, 0.0),
//! ]);
//! builder.add_quads(&square);
//!
//! let scene = builder.finalized_scene_node().unwrap();
//! let (_, geom) = scene.geometries().next().unwrap();
//! assert_eq!(geom.count(), 4);
//! assert_eq!(geom.triangle_count(), 2);
//! assert_eq!(geom.normal(0), Vector3::z());
//!
//! // Write it out as a binary STL
//! let mut stl = vec![];
//! scene.write_stl(&mut stl)?;
//! assert_eq!(stl.len(), 84 + 2 * 50);
//! # Ok::<(), geomkit::Error>(())
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

pub mod array;
pub mod builder;
pub mod geometry;

mod error;
pub use error::Error;

mod indexed;
