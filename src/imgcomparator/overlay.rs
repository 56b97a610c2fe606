use super::engine::DiffResult;
use super::regions::{ChangedRegion, Severity};
use super::Image;

const BORDER: u32 = 2;
// fill opacity out of 256
const TINT_ALPHA: u32 = 64;

/// Opaque highlight colour used for a severity level.
pub fn severity_color(level: Severity) -> u32 {
    match level {
        Severity::Minor => 0xFFFDD835,
        Severity::Warning => 0xFFFB8C00,
        Severity::Critical => 0xFFE53935,
    }
}

fn blend(base: u32, over: u32, alpha: u32) -> u32 {
    let mix = |shift: u32| {
        let b = (base >> shift) & 0xFF;
        let o = (over >> shift) & 0xFF;
        ((o * alpha + b * (256 - alpha)) >> 8) & 0xFF
    };
    (base & 0xFF00_0000) | (mix(16) << 16) | (mix(8) << 8) | mix(0)
}

fn paint_region(img: &mut Image, region: &ChangedRegion) {
    let color = severity_color(region.level);
    let right = region.right().min(img.width);
    let bottom = region.bottom().min(img.height);
    for y in region.y..bottom {
        for x in region.x..right {
            let on_border = x < region.x + BORDER
                || y < region.y + BORDER
                || x + BORDER >= right
                || y + BORDER >= bottom;
            let pixel = img.pixel(x, y);
            let painted = if on_border {
                color
            } else {
                blend(pixel, color, TINT_ALPHA)
            };
            img.set_pixel(x, y, painted);
        }
    }
}

/// Copy of `base` with each region outlined and tinted in its severity colour.
pub fn render_overlay(base: &Image, result: &DiffResult) -> Image {
    let mut img = base.clone();
    for region in &result.regions {
        paint_region(&mut img, region);
    }
    img
}
