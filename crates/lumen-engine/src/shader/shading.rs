//! CPU reference for the default fragment program in `default.wgsl`.

use glam::Vec4;

use super::Sideness;

/// Second-layer color treated as transparent: opaque cyan.
pub const KEY_COLOR: Vec4 = Vec4::new(0.0, 1.0, 1.0, 1.0);

/// Whether a fragment whose normal has `facing = dot(normal, +Z)` is dropped.
pub fn discards(sideness: Sideness, facing: f32) -> bool {
    match sideness {
        Sideness::DoubleSided => false,
        Sideness::SingleSided => facing >= 0.0,
        Sideness::Inverted => facing <= 0.0,
    }
}

/// Output color for `texture_count` bound layers sampled as `c0` and `c1`.
///
/// Without textures the result is opaque black.
pub fn composite(texture_count: u32, c0: Vec4, c1: Vec4) -> Vec4 {
    let mut color = Vec4::new(0.0, 0.0, 0.0, 1.0);
    if texture_count > 0 {
        color = c0;
    }
    if texture_count > 1 && c1 != KEY_COLOR {
        color = color * 0.2 + c1 * 0.8;
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sideness_table() {
        let cases = [
            (Sideness::DoubleSided, 1.0, false),
            (Sideness::DoubleSided, 0.0, false),
            (Sideness::DoubleSided, -1.0, false),
            (Sideness::SingleSided, 1.0, true),
            (Sideness::SingleSided, 0.0, true),
            (Sideness::SingleSided, -1.0, false),
            (Sideness::Inverted, 1.0, false),
            (Sideness::Inverted, 0.0, true),
            (Sideness::Inverted, -1.0, true),
        ];
        for (sideness, facing, expected) in cases {
            assert_eq!(discards(sideness, facing), expected, "{sideness:?} facing {facing}");
        }
    }

    #[test]
    fn first_layer_replaces() {
        let c0 = Vec4::new(0.5, 0.25, 1.0, 1.0);
        assert_eq!(composite(1, c0, Vec4::ONE), c0);
        assert_eq!(composite(0, c0, Vec4::ONE), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn second_layer_blends_unless_key_color() {
        let c0 = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let c1 = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let blended = composite(2, c0, c1);
        assert!((blended - Vec4::new(0.2, 0.0, 0.8, 1.0)).abs().max_element() < 1e-6);

        assert_eq!(composite(2, c0, KEY_COLOR), c0);
    }
}
