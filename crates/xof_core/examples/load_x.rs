//! Example: Load and inspect a DirectX `.X` file.
//!
//! Run with: cargo run --example load_x -- assets/cube.x

use std::env;

use xof_core::x::{load_x_with_options, ImportOptions};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: load_x <path-to-x-file> [--strict]");
        println!("\nExamples:");
        println!("  cargo run --example load_x -- assets/cube.x");
        println!("  cargo run --example load_x -- assets/cube.x --strict");
        return;
    }

    let path = &args[1];
    let strict = args.iter().any(|a| a == "--strict");
    let options = ImportOptions::default().with_strict_material_references(strict);
    println!("Loading .X file: {}", path);

    match load_x_with_options(path, &options) {
        Ok(imported) => {
            let scene = &imported.scene;
            let header = imported.header;
            println!("\n=== Scene: {} ===", scene.name);
            println!("Format: {}.{} {} ({}-bit floats)", header.major, header.minor, header.format, header.float_size);
            println!("Nodes: {}", scene.node_count());
            println!("Meshes: {}", scene.mesh_count());
            println!("Materials: {}", scene.material_count());
            println!("Textures: {}", scene.textures.len());
            println!("Total triangles: {}", scene.total_triangle_count());

            println!("\n--- Nodes ---");
            for node in &scene.nodes {
                let pos = scene.world_matrix(node.id).transform_point3(xof_math::Vec3::ZERO);
                println!(
                    "  [{}] {:?} parent {:?} at ({:.2}, {:.2}, {:.2})",
                    node.id, node.name, node.parent, pos.x, pos.y, pos.z
                );
            }

            println!("\n--- Meshes ---");
            for scene_mesh in &scene.meshes {
                let mesh = &scene_mesh.mesh;
                println!(
                    "  [{}] {:?} - {} vertices, {} triangles, UVs: {}",
                    scene_mesh.id,
                    scene_mesh.name,
                    mesh.vertex_count(),
                    mesh.triangle_count(),
                    mesh.has_uvs()
                );
                for (i, submesh) in mesh.submeshes.iter().enumerate() {
                    let material = scene_mesh
                        .submesh_material(i)
                        .map_or("<none>", |m| m.name.as_str());
                    println!(
                        "       Submesh {}: indices {}..{} material {:?}",
                        i,
                        submesh.index_start,
                        submesh.index_start + submesh.index_count,
                        material
                    );
                }
            }

            println!("\n--- Textures ---");
            for texture in &scene.textures {
                println!("  {} -> {}", texture.reference, texture.locator);
            }

            if !imported.diagnostics.is_empty() {
                println!("\n--- Diagnostics ---");
                for diagnostic in &imported.diagnostics {
                    println!("  {}", diagnostic);
                }
            }

            let world_bounds = scene.world_bounds();
            println!("\n--- World Bounds ---");
            println!(
                "  Min: ({:.2}, {:.2}, {:.2})",
                world_bounds.x.min, world_bounds.y.min, world_bounds.z.min
            );
            println!(
                "  Max: ({:.2}, {:.2}, {:.2})",
                world_bounds.x.max, world_bounds.y.max, world_bounds.z.max
            );
        }
        Err(e) => {
            eprintln!("Error loading .X file: {}", e);
        }
    }
}
