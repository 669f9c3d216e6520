use bytemuck::{Pod, Zeroable};
use nalgebra::Vector3;

pub const SHADER_NAME: &str = "triangle.glsl";

/// Vertex and fragment stages share one source; `SHADER_STAGE` picks the stage.
pub const SHADER_SOURCE: &str = include_str!("shaders/triangle.glsl");

/// Matches the scalar-layout `TriangleVertex` struct in the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GeometryVertex {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
}

/// Converts a packed `0xRRGGBB` color into normalized components.
pub fn rgb(hex: u32) -> Vector3<f32> {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    Vector3::new(channel(16), channel(8), channel(0))
}

/// Vertex order matches `gl_VertexIndex` in the shader.
pub fn triangle_vertices() -> [GeometryVertex; 3] {
    [
        // Left vertex, red
        GeometryVertex {
            position: Vector3::new(-0.5, 0.5, 0.0),
            color: rgb(0xff0000),
        },
        // Right vertex, green
        GeometryVertex {
            position: Vector3::new(0.5, 0.5, 0.0),
            color: rgb(0x00ff00),
        },
        // Top vertex, blue
        GeometryVertex {
            position: Vector3::new(0.0, -0.5, 0.0),
            color: rgb(0x0000ff),
        },
    ]
}
