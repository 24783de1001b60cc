//! CPU rendition of the grid fragment stage.
//!
//! The GPU evaluates this per pixel; the functions here reproduce the same
//! arithmetic so the visual contract can be inspected and tested without a
//! device. Coordinates are in surface pixels with a bottom-left origin.

use bytemuck::{Pod, Zeroable};

/// Cells per surface edge.
pub const GRID_CELLS: f32 = 20.0;
/// Normalized pointer distance beyond which lines vanish.
pub const VISIBILITY_RADIUS: f32 = 0.3;
/// Normalized pointer distance inside which lines thicken and bend.
pub const PROXIMITY_RADIUS: f32 = 0.2;
/// Line width as a fraction of a cell, far and near the pointer.
pub const LINE_WIDTH_FAR: f32 = 0.02;
pub const LINE_WIDTH_NEAR: f32 = 0.1;
/// Line feather as a fraction of a cell, far and near the pointer.
pub const LINE_FEATHER_FAR: f32 = 0.002;
pub const LINE_FEATHER_NEAR: f32 = 0.05;
/// Maximum displacement of cell coordinates toward the raw pointer.
pub const BEND_STRENGTH: f32 = 0.05;

/// Host-side image of the fragment stage's std140 uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GridUniforms {
    pub resolution: [f32; 2],
    pub mouse: [f32; 2],
    pub delayed_mouse: [f32; 2],
}

/// Intermediate terms of the effect for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSample {
    pub dist_to_mouse: f32,
    pub visibility: f32,
    pub line_width: f32,
    pub line_feather: f32,
    /// `(maskX + maskY) * visibility`, unclamped; reaches 2 where lines cross.
    pub intensity: f32,
}

/// GLSL `smoothstep`, including the reversed-edge form used by the effect.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn fract(value: f32) -> f32 {
    value - value.floor()
}

fn length(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

fn line_mask(coord: f32, width: f32, feather: f32) -> f32 {
    smoothstep(0.0, feather, coord) - smoothstep(width - feather, width, coord)
}

/// Evaluates the effect terms at `frag_coord`.
pub fn sample(frag_coord: [f32; 2], uniforms: &GridUniforms) -> GridSample {
    let [width, height] = uniforms.resolution;
    let st = [frag_coord[0] / width, frag_coord[1] / height];
    let pointer = [uniforms.mouse[0] / width, uniforms.mouse[1] / height];
    let delayed = [
        uniforms.delayed_mouse[0] / width,
        uniforms.delayed_mouse[1] / height,
    ];

    let dist_to_mouse = length([st[0] - delayed[0], st[1] - delayed[1]]);
    let visibility = smoothstep(VISIBILITY_RADIUS, 0.0, dist_to_mouse);
    let proximity = smoothstep(PROXIMITY_RADIUS, 0.0, dist_to_mouse);
    let line_width = mix(LINE_WIDTH_FAR, LINE_WIDTH_NEAR, proximity);
    let line_feather = mix(LINE_FEATHER_FAR, LINE_FEATHER_NEAR, proximity);

    let mut grid = [fract(st[0] * GRID_CELLS), fract(st[1] * GRID_CELLS)];
    let to_pointer = [pointer[0] - st[0], pointer[1] - st[1]];
    let reach = length(to_pointer);
    if reach > 0.000_001 {
        let bend = proximity * BEND_STRENGTH / reach;
        grid[0] += to_pointer[0] * bend;
        grid[1] += to_pointer[1] * bend;
    }

    let line = line_mask(grid[0], line_width, line_feather)
        + line_mask(grid[1], line_width, line_feather);

    GridSample {
        dist_to_mouse,
        visibility,
        line_width,
        line_feather,
        intensity: line * visibility,
    }
}

/// Final RGBA for `frag_coord`: white background blended toward black lines.
pub fn shade(frag_coord: [f32; 2], uniforms: &GridUniforms) -> [f32; 4] {
    let intensity = sample(frag_coord, uniforms).intensity.clamp(0.0, 1.0);
    let value = mix(1.0, 0.0, intensity);
    [value, value, value, 1.0]
}
