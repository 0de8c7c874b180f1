use crate::message::Segment;
use crate::types::{Color, StrokeMode};
use euclid::default::Point2D;
use image::{Rgba, RgbaImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// An RGBA raster the segments are painted onto. Starts fully transparent.
#[derive(Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.image.dimensions() == other.image.dimensions()
            && self.image.as_raw() == other.image.as_raw()
    }
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width() && y < self.height() {
            Some(self.image.get_pixel(x, y).0)
        } else {
            None
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == 0)
    }

    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = TRANSPARENT;
        }
    }

    /// Composites `layer` over this surface (source-over).
    pub fn blit(&mut self, layer: &Surface) {
        for (dst, src) in self.image.pixels_mut().zip(layer.image.pixels()) {
            *dst = source_over(*src, *dst);
        }
    }

    /// Raw RGBA bytes, row-major, suitable for `ImageData`.
    pub fn as_rgba(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Paints one segment. Reads nothing but its arguments, so live, replayed and
/// snapshot segments all render the same way.
pub fn draw_segment(surface: &mut Surface, segment: &Segment) {
    let paint = match segment.mode {
        StrokeMode::Eraser => TRANSPARENT,
        StrokeMode::Pen => {
            let c = Color::parse_hex(&segment.color).unwrap_or_else(|| {
                log::warn!("unparseable color {:?}, painting black", segment.color);
                Color::default()
            });
            Rgba([c.r, c.g, c.b, 255])
        }
    };

    let a = Point2D::new(segment.x1, segment.y1);
    let b = Point2D::new(segment.x2, segment.y2);
    let radius = segment.width / 2.0;

    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let min_x = (a.x.min(b.x) - radius).floor().max(0.0);
    let min_y = (a.y.min(b.y) - radius).floor().max(0.0);
    let max_x = (a.x.max(b.x) + radius).ceil().min(w);
    let max_y = (a.y.max(b.y) + radius).ceil().min(h);
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    // Round caps and joins fall out of testing against a capsule.
    for y in min_y as u32..max_y as u32 {
        for x in min_x as u32..max_x as u32 {
            let center = Point2D::new(x as f32 + 0.5, y as f32 + 0.5);
            if distance_to_segment(center, a, b) <= radius {
                let dst = surface.image.get_pixel_mut(x, y);
                *dst = match segment.mode {
                    StrokeMode::Eraser => TRANSPARENT,
                    StrokeMode::Pen => source_over(paint, *dst),
                };
            }
        }
    }
}

fn distance_to_segment(p: Point2D<f32>, a: Point2D<f32>, b: Point2D<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.square_length();
    if len2 == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).max(0.0).min(1.0);
    (a + ab * t - p).length()
}

fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src.0[3] as u32;
    match sa {
        255 => src,
        0 => dst,
        _ => {
            let da = dst.0[3] as u32;
            let inv = 255 - sa;
            let out_a = sa + da * inv / 255;
            if out_a == 0 {
                return TRANSPARENT;
            }
            let channel = |i: usize| {
                let s = src.0[i] as u32 * sa;
                let d = dst.0[i] as u32 * da * inv / 255;
                ((s + d) / out_a).min(255) as u8
            };
            Rgba([channel(0), channel(1), channel(2), out_a as u8])
        }
    }
}
