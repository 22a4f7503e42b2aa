use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use nalgebra::Vector3;

use geomkit::{
    builder::{GeometryBuilder, Scene, Smoothing},
    geometry::GeometryData,
};

/// Builds simple shapes and writes them as binary STL files
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Name of a `.stl` file to write
    #[clap(short, long, global = true)]
    out: Option<PathBuf>,

    /// Share normals between adjacent faces
    #[clap(long, global = true)]
    smooth: bool,

    /// Overall size of the shape
    #[clap(long, global = true, default_value_t = 1.0)]
    size: f32,
}

#[derive(Subcommand)]
enum Command {
    /// An axis-aligned cube, centered on the origin
    Cube,

    /// An extruded regular polygon
    Prism {
        /// Number of sides
        #[clap(long, default_value_t = 6)]
        sides: usize,
    },

    /// A wavy ribbon built from a triangle strip
    Strip {
        /// Number of segments along the ribbon
        #[clap(long, default_value_t = 32)]
        sides: usize,
    },
}

fn points<I: IntoIterator<Item = [f32; 3]>>(pts: I) -> GeometryData {
    GeometryData::from_positions(pts.into_iter().map(Vector3::from))
}

////////////////////////////////////////////////////////////////////////////////

fn build_cube(builder: &mut GeometryBuilder, size: f32) {
    let h = size / 2.0;
    let corner = |i: usize| {
        let s = |bit: usize| if i & bit != 0 { h } else { -h };
        [s(1), s(2), s(4)]
    };
    // Each face is listed counter-clockwise when seen from outside
    const FACES: [[usize; 4]; 6] = [
        [0, 2, 3, 1], // -z
        [4, 5, 7, 6], // +z
        [0, 1, 5, 4], // -y
        [2, 6, 7, 3], // +y
        [0, 4, 6, 2], // -x
        [1, 3, 7, 5], // +x
    ];
    let quads = points(FACES.iter().flatten().map(|i| corner(*i)));
    builder.add_quads(&quads);
}

fn build_prism(builder: &mut GeometryBuilder, size: f32, sides: usize) {
    let r = size / 2.0;
    let ring = |z: f32| {
        (0..sides).map(move |i| {
            let a = std::f32::consts::TAU * i as f32 / sides as f32;
            [r * a.cos(), r * a.sin(), z]
        })
    };

    let n = builder.current_node();
    builder.node_mut(n).set_name("top");
    builder.add_triangulated_face(&points(
        std::iter::once([0.0, 0.0, size]).chain(ring(size)),
    ));

    // Walls need closed outlines, repeating the first vertex at the end
    let n = builder.new_node();
    builder.node_mut(n).set_name("walls");
    let top = points(ring(size).chain(ring(size).take(1)));
    let bottom = points(ring(0.0).chain(ring(0.0).take(1)));
    builder.add_quads_interleaved(&top, &bottom);

    let n = builder.new_node();
    builder.node_mut(n).set_name("bottom");
    let mut face = points([[0.0, 0.0, 0.0]]);
    face.append_geometry(&points(ring(0.0)).reversed());
    builder.add_triangulated_face(&face);
}

fn build_strip(builder: &mut GeometryBuilder, size: f32, segments: usize) {
    let segments = segments.max(1);
    let strip = points((0..=segments).flat_map(|i| {
        let x = size * i as f32 / segments as f32;
        let z = (x / size * std::f32::consts::TAU).sin() * size / 8.0;
        [[x, 0.0, z], [x, size / 4.0, z]]
    }));
    builder.add_triangle_strip(&strip);
}

fn summarize(scene: &Scene) {
    let triangles: usize =
        scene.draw_ranges().map(|(.., count)| count / 3).sum();
    info!(
        "Scene has {} nodes, {} packed geometries, {} triangles",
        scene.node_count(),
        scene.geometry_count(),
        triangles,
    );
    for (id, g) in scene.geometries() {
        info!(
            "  {id:?}: {} vertices, {} indices, fields {:?}",
            g.count(),
            g.index_count(),
            g.fields()
        );
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    let smoothing = if args.smooth {
        Smoothing::Smooth
    } else {
        Smoothing::Faceted
    };

    let start = Instant::now();
    let mut builder = GeometryBuilder::new();
    builder.new_section(smoothing);
    match args.cmd {
        Command::Cube => build_cube(&mut builder, args.size),
        Command::Prism { sides } => {
            anyhow::ensure!(sides >= 3, "a prism needs at least 3 sides");
            build_prism(&mut builder, args.size, sides)
        }
        Command::Strip { sides } => build_strip(&mut builder, args.size, sides),
    }
    let scene = builder
        .finalized_scene_node()
        .ok_or_else(|| anyhow::anyhow!("builder produced no scene"))?;
    info!("Built {smoothing} scene in {:?}", start.elapsed());
    summarize(&scene);

    if let Some(out) = args.out {
        let start = Instant::now();
        let mut handle = std::fs::File::create(&out)?;
        scene.write_stl(&mut handle)?;
        info!("Wrote {} in {:?}", out.display(), start.elapsed());
    }
    Ok(())
}
