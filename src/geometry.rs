//! Geometric primitives for normalized results.
//!
//! These types carry the shape invariants the renderer relies on: bounding
//! box coordinates are ordered after normalization, polygons with fewer than
//! three points are flagged as degenerate, and quad boxes hold exactly four
//! points with arbitrary winding.

use imageproc::point::Point as ImageProcPoint;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Converts this point to an imageproc point with integer coordinates.
    pub fn to_imageproc_point(&self) -> ImageProcPoint<i32> {
        ImageProcPoint::new(self.x as i32, self.y as i32)
    }
}

/// An axis-aligned bounding box in image pixel space.
///
/// After normalization `x1 <= x2` and `y1 <= y2` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X-coordinate of the left edge.
    pub x1: f32,
    /// Y-coordinate of the top edge.
    pub y1: f32,
    /// X-coordinate of the right edge.
    pub x2: f32,
    /// Y-coordinate of the bottom edge.
    pub y2: f32,
}

impl BoundingBox {
    /// Creates a bounding box from possibly unordered corner coordinates.
    ///
    /// Raw results may arrive with swapped corners; they are silently
    /// reordered so that `x1 <= x2` and `y1 <= y2`, never rejected. The
    /// coordinate set is preserved.
    pub fn from_unordered(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// An ordered sequence of 2D points forming a closed polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The vertices of the polygon, in order.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a new polygon from a vector of vertices.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Returns true when the polygon has fewer than three vertices.
    ///
    /// Degenerate polygons are skipped at render time, not drawn.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }
}

/// A quadrilateral text region with exactly four corners.
///
/// Winding and convexity are not validated; OCR quads are not
/// rectangle-constrained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadBox {
    /// The four corners of the quadrilateral.
    pub points: [Point; 4],
}

impl QuadBox {
    /// Creates a new quad box from four corners.
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unordered_corrects_swapped_corners() {
        let bbox = BoundingBox::from_unordered(50.0, 80.0, 10.0, 20.0);
        assert_eq!(bbox.x1, 10.0);
        assert_eq!(bbox.y1, 20.0);
        assert_eq!(bbox.x2, 50.0);
        assert_eq!(bbox.y2, 80.0);
    }

    #[test]
    fn test_from_unordered_keeps_ordered_corners() {
        let bbox = BoundingBox::from_unordered(10.0, 20.0, 50.0, 80.0);
        assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (10.0, 20.0, 50.0, 80.0));
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 60.0);
    }

    #[test]
    fn test_degenerate_polygon() {
        assert!(Polygon::new(vec![]).is_degenerate());
        assert!(Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).is_degenerate());
        assert!(
            !Polygon::new(vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
            ])
            .is_degenerate()
        );
    }
}
