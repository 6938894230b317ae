use glam::Vec4;

/// Pack a linear RGBA color in [0, 1] into 0xAABBGGRR, the byte order the
/// shaders unpack
pub fn rgba_to_aabbggrr(color: Vec4) -> u32 {
    let [r, g, b, a] = color
        .clamp(Vec4::ZERO, Vec4::ONE)
        .to_array()
        .map(|c| (c * 255.0) as u32);
    (a << 24) | (b << 16) | (g << 8) | r
}

pub const WHITE: u32 = 0xFFFF_FFFF;
