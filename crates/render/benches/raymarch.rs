use std::hint::black_box;
use std::time::Instant;

use glam::{UVec3, Vec3};
use voxsprite_atlas::VoxelGrid;
use voxsprite_common::Rgba;
use voxsprite_render::{Camera, SoftwareRenderer, SpriteInstance, march_counted};

fn shell(edge: u32) -> VoxelGrid {
    let mut grid = VoxelGrid::new(UVec3::splat(edge)).unwrap();
    let size = grid.size();
    let cells: Vec<UVec3> = grid.iter().map(|(v, _)| v).collect();
    for v in cells {
        let on_edge = [v.x, v.y, v.z]
            .iter()
            .zip([size.x, size.y, size.z])
            .any(|(&c, s)| c == 0 || c == s - 1);
        if on_edge && (v.x + v.y + v.z) % 3 == 0 {
            grid.set(v, Rgba::rgb((v.x * 16) as u8, (v.y * 16) as u8, 128)).unwrap();
        }
    }
    grid
}

fn bench_march(edge: u32, iterations: usize) {
    let grid = shell(edge);
    let origin = Vec3::new(1.3, 0.9, 2.1);
    let near = Vec3::new(0.1, 0.05, 0.5);

    let mut steps = 0;
    let start = Instant::now();
    for _ in 0..iterations {
        let (_, visited) = march_counted(black_box(&grid), black_box(origin), black_box(near));
        steps += visited;
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  march ({edge}³, {iterations} rays, {steps} steps): {per_iter:?}/ray, total {elapsed:?}");
}

fn bench_software(edge: u32, side: u32) {
    let grid = shell(edge);
    let camera = Camera::look_at(Vec3::new(1.2, 1.0, 2.0), Vec3::ZERO);
    let renderer = SoftwareRenderer::new(side, side);
    let instances = [SpriteInstance {
        model: glam::Mat4::IDENTITY,
        sampler: &grid,
    }];

    let start = Instant::now();
    let image = renderer.render(black_box(&camera), black_box(&instances));
    let elapsed = start.elapsed();
    black_box(image);
    println!("  software frame ({edge}³, {side}x{side}): {elapsed:?}");
}

fn main() {
    println!("=== Ray-March Benchmarks ===\n");

    println!("Single ray:");
    bench_march(8, 100_000);
    bench_march(16, 100_000);
    bench_march(64, 10_000);

    println!("\nSoftware frame:");
    bench_software(8, 128);
    bench_software(16, 256);

    println!("\n=== Done ===");
}
