//! Perceptual colour distance (CIE76 ΔE over Lab).

use nalgebra::{Matrix3, Vector3};

/// D65 reference white
const WHITE_X: f64 = 0.95047;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.08883;

const LAB_EPSILON: f64 = 0.008856;

/// CIE L*a*b* triple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

fn srgb_to_xyz_matrix() -> Matrix3<f64> {
    Matrix3::new(
        0.4124564, 0.3575761, 0.1804375, //
        0.2126729, 0.7151522, 0.0721750, //
        0.0193339, 0.1191920, 0.9503041,
    )
}

/// Undo the sRGB transfer curve for one 8-bit channel.
#[inline]
pub fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear RGB to CIE XYZ (D65).
pub fn rgb_to_xyz(r: u8, g: u8, b: u8) -> Vector3<f64> {
    let linear = Vector3::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    srgb_to_xyz_matrix() * linear
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

pub fn xyz_to_lab(xyz: &Vector3<f64>) -> Lab {
    let fx = lab_f(xyz.x / WHITE_X);
    let fy = lab_f(xyz.y / WHITE_Y);
    let fz = lab_f(xyz.z / WHITE_Z);
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert a packed `0xAARRGGBB` pixel to Lab. Alpha is ignored.
pub fn pixel_to_lab(pixel: u32) -> Lab {
    let r = ((pixel >> 16) & 0xFF) as u8;
    let g = ((pixel >> 8) & 0xFF) as u8;
    let b = (pixel & 0xFF) as u8;
    xyz_to_lab(&rgb_to_xyz(r, g, b))
}

/// Euclidean distance in Lab (ΔE76).
pub fn delta_e76(a: &Lab, b: &Lab) -> f64 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// ΔE between two packed pixels. Identical RGB short-circuits to zero.
#[inline]
pub fn pixel_distance(p1: u32, p2: u32) -> f64 {
    if (p1 & 0x00FF_FFFF) == (p2 & 0x00FF_FFFF) {
        return 0.0;
    }
    delta_e76(&pixel_to_lab(p1), &pixel_to_lab(p2))
}
