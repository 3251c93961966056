//! Imperative 2D drawing surface: an RGBA8 pixel buffer with stroked
//! polylines, circles and a scoped group translation. Coverage is computed
//! per pixel from signed distance and blended src-over.

use crate::anim::Point;
use cgmath::InnerSpace;
use image::{Rgba, RgbaImage};

pub struct PixelSurface {
    img: RgbaImage,
    offset: Point,
    // Reused per-stroke coverage scratch so overlapping capsule joints of a
    // translucent stroke blend once, not once per segment.
    scratch: Vec<f32>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            img: RgbaImage::new(width, height),
            offset: Point::new(0.0, 0.0),
            scratch: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.img
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.img.get_pixel(x, y).0
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for px in self.img.pixels_mut() {
            *px = Rgba(color);
        }
    }

    /// Runs `f` with all draw coordinates shifted by `(dx, dy)`.
    pub fn with_offset(&mut self, dx: f32, dy: f32, f: impl FnOnce(&mut Self)) {
        let saved = self.offset;
        self.offset += Point::new(dx, dy);
        f(self);
        self.offset = saved;
    }

    pub fn stroke_polyline(&mut self, points: &[Point], width: f32, color: [u8; 4]) {
        if points.len() < 2 {
            return;
        }
        let half = width * 0.5;
        let (w, h) = (self.width() as i64, self.height() as i64);

        // Stroke bounding box in pixels, clamped to the surface.
        let mut min = Point::new(f32::MAX, f32::MAX);
        let mut max = Point::new(f32::MIN, f32::MIN);
        for p in points {
            let p = *p + self.offset;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        let x0 = ((min.x - half - 1.0).floor() as i64).clamp(0, w);
        let y0 = ((min.y - half - 1.0).floor() as i64).clamp(0, h);
        let x1 = ((max.x + half + 1.0).ceil() as i64).clamp(0, w);
        let y1 = ((max.y + half + 1.0).ceil() as i64).clamp(0, h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let (bw, bh) = ((x1 - x0) as usize, (y1 - y0) as usize);

        self.scratch.clear();
        self.scratch.resize(bw * bh, 0.0);

        for seg in points.windows(2) {
            let a = seg[0] + self.offset;
            let b = seg[1] + self.offset;
            let sx0 = ((a.x.min(b.x) - half - 1.0).floor() as i64).clamp(x0, x1);
            let sy0 = ((a.y.min(b.y) - half - 1.0).floor() as i64).clamp(y0, y1);
            let sx1 = ((a.x.max(b.x) + half + 1.0).ceil() as i64).clamp(x0, x1);
            let sy1 = ((a.y.max(b.y) + half + 1.0).ceil() as i64).clamp(y0, y1);
            for py in sy0..sy1 {
                for px in sx0..sx1 {
                    let p = Point::new(px as f32 + 0.5, py as f32 + 0.5);
                    let d = segment_distance(p, a, b);
                    let cov = (half + 0.5 - d).clamp(0.0, 1.0);
                    if cov > 0.0 {
                        let idx = (py - y0) as usize * bw + (px - x0) as usize;
                        if cov > self.scratch[idx] {
                            self.scratch[idx] = cov;
                        }
                    }
                }
            }
        }

        for row in 0..bh {
            for col in 0..bw {
                let cov = self.scratch[row * bw + col];
                if cov > 0.0 {
                    blend(
                        &mut self.img,
                        (x0 + col as i64) as u32,
                        (y0 + row as i64) as u32,
                        color,
                        cov,
                    );
                }
            }
        }
    }

    pub fn fill_circle(&mut self, center: Point, radius: f32, color: [u8; 4]) {
        let c = center + self.offset;
        self.circle_coverage(c, radius + 1.0, |d| (radius + 0.5 - d).clamp(0.0, 1.0), color);
    }

    pub fn stroke_circle(&mut self, center: Point, radius: f32, width: f32, color: [u8; 4]) {
        let c = center + self.offset;
        let half = width * 0.5;
        self.circle_coverage(c, radius + half + 1.0, move |d| {
            (half + 0.5 - (d - radius).abs()).clamp(0.0, 1.0)
        }, color);
    }

    fn circle_coverage(
        &mut self,
        c: Point,
        reach: f32,
        coverage: impl Fn(f32) -> f32,
        color: [u8; 4],
    ) {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let x0 = ((c.x - reach).floor() as i64).clamp(0, w);
        let y0 = ((c.y - reach).floor() as i64).clamp(0, h);
        let x1 = ((c.x + reach).ceil() as i64).clamp(0, w);
        let y1 = ((c.y + reach).ceil() as i64).clamp(0, h);
        for py in y0..y1 {
            for px in x0..x1 {
                let p = Point::new(px as f32 + 0.5, py as f32 + 0.5);
                let cov = coverage((p - c).magnitude());
                if cov > 0.0 {
                    blend(&mut self.img, px as u32, py as u32, color, cov);
                }
            }
        }
    }
}

fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 <= f32::EPSILON {
        return (p - a).magnitude();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).magnitude()
}

fn blend(img: &mut RgbaImage, x: u32, y: u32, color: [u8; 4], coverage: f32) {
    let alpha = (color[3] as f32 / 255.0) * coverage;
    if alpha <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x, y);
    for ch in 0..3 {
        let src = color[ch] as f32;
        let d = dst.0[ch] as f32;
        dst.0[ch] = (src * alpha + d * (1.0 - alpha)).round() as u8;
    }
    let da = dst.0[3] as f32 / 255.0;
    dst.0[3] = ((alpha + da * (1.0 - alpha)) * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_fills_every_pixel() {
        let mut s = PixelSurface::new(8, 8);
        s.clear([10, 20, 30, 255]);
        assert_eq!(s.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(s.pixel(7, 7), [10, 20, 30, 255]);
    }

    #[test]
    fn filled_circle_covers_center_not_corners() {
        let mut s = PixelSurface::new(32, 32);
        s.clear([0, 0, 0, 255]);
        s.fill_circle(Point::new(16.0, 16.0), 5.0, [255, 255, 255, 255]);
        assert_eq!(s.pixel(16, 16), [255, 255, 255, 255]);
        assert_eq!(s.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn stroked_circle_leaves_center_unfilled() {
        let mut s = PixelSurface::new(48, 48);
        s.clear([0, 0, 0, 255]);
        s.stroke_circle(Point::new(24.0, 24.0), 10.0, 4.0, [255, 0, 0, 255]);
        assert_eq!(s.pixel(24, 24), [0, 0, 0, 255]);
        // On the ring.
        assert_eq!(s.pixel(34, 24), [255, 0, 0, 255]);
    }

    #[test]
    fn polyline_marks_the_segment_only() {
        let mut s = PixelSurface::new(64, 64);
        s.clear([0, 0, 0, 255]);
        let pts = [Point::new(8.0, 32.0), Point::new(56.0, 32.0)];
        s.stroke_polyline(&pts, 4.0, [0, 255, 0, 255]);
        assert_eq!(s.pixel(32, 32), [0, 255, 0, 255]);
        assert_eq!(s.pixel(32, 8), [0, 0, 0, 255]);
    }

    #[test]
    fn offset_shifts_draws() {
        let mut s = PixelSurface::new(32, 32);
        s.clear([0, 0, 0, 255]);
        s.with_offset(10.0, 6.0, |s| {
            s.fill_circle(Point::new(5.0, 5.0), 3.0, [255, 255, 255, 255]);
        });
        assert_eq!(s.pixel(15, 11), [255, 255, 255, 255]);
        assert_eq!(s.pixel(5, 5), [0, 0, 0, 255]);
        // Offset is restored afterwards.
        s.fill_circle(Point::new(5.0, 5.0), 2.0, [0, 0, 255, 255]);
        assert_eq!(s.pixel(5, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn translucent_stroke_blends_once_at_joints() {
        let mut s = PixelSurface::new(64, 64);
        s.clear([0, 0, 0, 255]);
        let pts = [
            Point::new(8.0, 32.0),
            Point::new(32.0, 32.0),
            Point::new(56.0, 32.0),
        ];
        s.stroke_polyline(&pts, 8.0, [255, 255, 255, 128]);
        // Joint pixel matches mid-segment pixel: no double blend.
        assert_eq!(s.pixel(32, 32), s.pixel(20, 32));
    }
}
