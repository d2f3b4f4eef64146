//! Animated history field: one point per (row, column) of the history
//! ring, rows along the depth axis, columns along the width axis.
//!
//! Geometry is built once as camera-facing quads; each frame only the
//! vertex positions (height) and colors are rewritten. Macroquad batches
//! geometry with a per-drawcall limit, so points are chunked into
//! multiple meshes.

use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;

use sphy::frame::WAVE_MAX;
use sphy::history::HistoryRing;

const POINTS_PER_MESH: usize = 200;
const FIELD_W: f32 = 20.0;
const FIELD_D: f32 = 30.0;
const HEIGHT_SCALE: f32 = 5.0;
const POINT_SIZE: f32 = 0.11;

pub struct VolumetricSurface {
    rows: usize,
    cols: usize,
    meshes: Vec<Mesh>,
}

impl VolumetricSurface {
    pub fn new(rows: usize, cols: usize) -> Self {
        let total = rows * cols;
        let mut meshes = Vec::new();

        let mut start = 0usize;
        while start < total {
            let count = POINTS_PER_MESH.min(total - start);

            let mut vertices = Vec::with_capacity(count * 4);
            let mut indices = Vec::with_capacity(count * 6);
            for local in 0..count {
                let base = (local * 4) as u16;
                for _ in 0..4 {
                    vertices.push(Vertex {
                        position: Vec3::ZERO,
                        uv: vec2(0.0, 0.0),
                        color: [0, 0, 0, 0],
                        normal: vec4(0.0, 0.0, 1.0, 0.0),
                    });
                }
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }

            meshes.push(Mesh {
                vertices,
                indices,
                texture: None,
            });
            start += count;
        }

        Self { rows, cols, meshes }
    }

    /// Rewrite heights and colors from the ring. Quads face the camera,
    /// so corner offsets come from the current view axes; topology and
    /// buffer sizes never change.
    pub fn sync(&mut self, ring: &HistoryRing, camera: &Camera3D) {
        let forward = (camera.target - camera.position).normalize_or_zero();
        let mut side = forward.cross(camera.up);
        if side.length_squared() < 1e-8 {
            side = vec3(1.0, 0.0, 0.0);
        }
        let side = side.normalize() * POINT_SIZE;
        let up = side.cross(forward).normalize() * POINT_SIZE;

        let rows = self.rows.max(1) as f32;
        let cols = self.cols.max(1) as f32;

        let mut index = 0usize;
        for (r, row) in ring.rows().enumerate().take(self.rows) {
            let z = (r as f32 / rows - 0.5) * FIELD_D;
            for c in 0..self.cols {
                let amp = row.get(c).copied().unwrap_or(0);
                let intensity = f32::from(amp) / f32::from(WAVE_MAX);

                let x = (c as f32 / cols - 0.5) * FIELD_W;
                let center = vec3(x, intensity * HEIGHT_SCALE, z);
                let rgba: [u8; 4] = Color::new(
                    0.1,
                    0.5 + intensity * 0.5,
                    0.2 + intensity * 0.8,
                    0.85,
                )
                .into();

                let mesh = &mut self.meshes[index / POINTS_PER_MESH];
                let vi = (index % POINTS_PER_MESH) * 4;
                let corners = [
                    center - side - up,
                    center + side - up,
                    center + side + up,
                    center - side + up,
                ];
                for (k, corner) in corners.iter().enumerate() {
                    let v = &mut mesh.vertices[vi + k];
                    v.position = *corner;
                    v.color = rgba;
                }
                index += 1;
            }
        }
    }

    pub fn draw(&self) {
        for mesh in &self.meshes {
            draw_mesh(mesh);
        }
    }

    /// Faint reference grid under the field.
    pub fn draw_floor(&self) {
        let half_w = FIELD_W * 0.5 + 1.0;
        let half_d = FIELD_D * 0.5 + 1.0;
        let step = 2.5;
        let col = Color::from_rgba(255, 255, 255, 26);

        let mut x = -half_w;
        while x <= half_w {
            draw_line_3d(vec3(x, 0.0, -half_d), vec3(x, 0.0, half_d), col);
            x += step;
        }
        let mut z = -half_d;
        while z <= half_d {
            draw_line_3d(vec3(-half_w, 0.0, z), vec3(half_w, 0.0, z), col);
            z += step;
        }
    }
}
