//! Static full-screen quad and its shaders.

/// Vertex shader: passes texture coordinates through, positions in clip space.
pub const VERTEX_SHADER: &str = "\
attribute vec2 vPosition;
attribute vec2 vTexCoord;
varying vec2 texCoord;
void main() {
  texCoord = vTexCoord;
  gl_Position = vec4(vPosition.x, vPosition.y, 1.0, 1.0);
}
";

/// Fragment shader: samples the external output texture.
pub const FRAGMENT_SHADER: &str = "\
#extension GL_OES_EGL_image_external : enable
precision mediump float;
uniform samplerExternalOES sTexture;
varying vec2 texCoord;
void main() {
  gl_FragColor = texture2D(sTexture, texCoord);
}
";

/// Clip-space corners of the quad, triangle-strip order.
pub const QUAD_POSITIONS: [f32; 8] = [1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, -1.0];

/// Texture coordinates matching `QUAD_POSITIONS`.
pub const QUAD_TEX_COORDS: [f32; 8] = [1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0];

/// A triangle-strip quad with per-vertex position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Position attribute name.
    pub position_attribute: &'static str,

    /// Texture coordinate attribute name.
    pub tex_coord_attribute: &'static str,

    /// Two floats per vertex.
    pub positions: &'static [f32; 8],

    /// Two floats per vertex.
    pub tex_coords: &'static [f32; 8],
}

impl Quad {
    /// Number of vertices drawn.
    pub const VERTEX_COUNT: usize = 4;

    /// Floats per vertex attribute.
    pub const COMPONENTS: usize = 2;

    /// Byte stride of one vertex attribute.
    pub const STRIDE: usize = Self::COMPONENTS * std::mem::size_of::<f32>();
}

/// The quad covering the whole viewport.
pub const QUAD: Quad = Quad {
    position_attribute: "vPosition",
    tex_coord_attribute: "vTexCoord",
    positions: &QUAD_POSITIONS,
    tex_coords: &QUAD_TEX_COORDS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_covers_clip_space() {
        for corner in QUAD_POSITIONS.chunks(Quad::COMPONENTS) {
            assert_eq!(corner[0].abs(), 1.0);
            assert_eq!(corner[1].abs(), 1.0);
        }
        assert_eq!(QUAD_POSITIONS.len(), Quad::VERTEX_COUNT * Quad::COMPONENTS);
        assert_eq!(Quad::STRIDE, 8);
    }

    #[test]
    fn test_tex_coords_follow_positions() {
        // Clip-space [-1, 1] maps onto texture space [0, 1].
        for (pos, uv) in QUAD_POSITIONS.iter().zip(QUAD_TEX_COORDS.iter()) {
            assert_eq!((pos + 1.0) / 2.0, *uv);
        }
    }

    #[test]
    fn test_shaders_agree_on_names() {
        assert!(VERTEX_SHADER.contains(QUAD.position_attribute));
        assert!(VERTEX_SHADER.contains(QUAD.tex_coord_attribute));
        assert!(FRAGMENT_SHADER.contains("sTexture"));
    }
}
