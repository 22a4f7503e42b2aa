//! STL export
use super::{PackedGeometry, Scene};
use crate::Error;
use nalgebra::Vector3;
use std::io::{BufWriter, Write};

const HEADER: &[u8] = b"This is a binary STL file exported by geomkit";
static_assertions::const_assert!(HEADER.len() <= 80);

fn write_header<W: Write>(out: &mut W, triangles: usize) -> Result<(), Error> {
    out.write_all(HEADER)?;
    out.write_all(&[0u8; 80 - HEADER.len()])?;
    out.write_all(&(triangles as u32).to_le_bytes())?;
    Ok(())
}

impl PackedGeometry {
    fn corner(&self, i: u32) -> Result<Vector3<f32>, Error> {
        self.positions()
            .get(i as usize)
            .copied()
            .ok_or(Error::BadIndex(i, self.count()))
    }

    /// Writes a single facet record for the given index triple
    fn write_facet<W: Write>(
        &self,
        out: &mut W,
        t: [u32; 3],
    ) -> Result<(), Error> {
        let [a, b, c] = t.map(|i| self.corner(i));
        let (a, b, c) = (a?, b?, c?);
        let normal = (b - a).cross(&(c - a));
        for p in normal.iter().chain(&a).chain(&b).chain(&c) {
            out.write_all(&p.to_le_bytes())?;
        }
        out.write_all(&[0u8; std::mem::size_of::<u16>()])?; // attributes
        Ok(())
    }

    /// Writes every triangle as a binary STL
    pub fn write_stl<F: Write>(&self, out: &mut F) -> Result<(), Error> {
        // Many small writes, typically to a file
        let mut out = BufWriter::new(out);
        write_header(&mut out, self.triangle_count())?;
        for t in self.triangles() {
            self.write_facet(&mut out, t)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Scene {
    /// Writes every triangle drawn by the scene's nodes as a binary STL
    ///
    /// Triangles from all packed geometries are merged into one file.
    pub fn write_stl<F: Write>(&self, out: &mut F) -> Result<(), Error> {
        let mut out = BufWriter::new(out);
        let total = self.draw_ranges().map(|(.., count)| count / 3).sum();
        write_header(&mut out, total)?;
        for (_, g, start, count) in self.draw_ranges() {
            let geom = self.geometry(g);
            let end = (start + count).min(geom.index_count());
            let range = &geom.indices().as_slice()[start.min(end)..end];
            for t in range.chunks_exact(3) {
                geom.write_facet(&mut out, [t[0], t[1], t[2]])?;
            }
        }
        out.flush()?;
        Ok(())
    }
}
