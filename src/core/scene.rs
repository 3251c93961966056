//! Declarative scene tree for the vector screen: path and circle elements
//! under a translated group, rebuilt each render tick and rasterized onto a
//! pixel surface by the view layer.

use crate::anim::Point;
use crate::core::canvas::PixelSurface;
use crate::core::curve;

/// Max x distance between stroked samples after curve smoothing.
const SMOOTH_STEP_PX: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: [u8; 4],
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Open path through `points`, smoothed before stroking.
    Path { points: Vec<Point>, stroke: Stroke },
    Circle {
        center: Point,
        radius: f32,
        fill: Option<[u8; 4]>,
        stroke: Option<Stroke>,
    },
}

/// One frame's scene: a cleared background and a single translated group of
/// elements, drawn in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub clear_color: [u8; 4],
    pub translate: Point,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn rasterize(&self, surface: &mut PixelSurface) {
        surface.clear(self.clear_color);
        surface.with_offset(self.translate.x, self.translate.y, |s| {
            for element in &self.elements {
                match element {
                    Element::Path { points, stroke } => {
                        let dense = curve::sample(points, SMOOTH_STEP_PX);
                        s.stroke_polyline(&dense, stroke.width, stroke.color);
                    }
                    Element::Circle {
                        center,
                        radius,
                        fill,
                        stroke,
                    } => {
                        if let Some(color) = fill {
                            s.fill_circle(*center, *radius, *color);
                        }
                        if let Some(stroke) = stroke {
                            s.stroke_circle(*center, *radius, stroke.width, stroke.color);
                        }
                    }
                }
            }
        });
    }
}
