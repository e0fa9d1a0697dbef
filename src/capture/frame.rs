//! Raw RGB frames and the annotation painter

use crate::posture::{Point2D, Rgb};
use bytes::Bytes;

const CHANNELS: usize = 3;

/// An immutable RGB8 frame as produced by a frame source.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Monotonic sequence number assigned by the source
    pub seq: u64,
    data: Bytes,
}

impl Frame {
    pub fn blank(width: u32, height: u32, seq: u64) -> Self {
        Self {
            width,
            height,
            seq,
            data: Bytes::from(vec![0u8; width as usize * height as usize * CHANNELS]),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some(Rgb(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Horizontally flipped copy, so the preview behaves like a mirror.
    pub fn mirrored(&self) -> Frame {
        let row_len = self.width as usize * CHANNELS;
        let mut out = Vec::with_capacity(self.data.len());
        for row in self.data.chunks_exact(row_len.max(1)) {
            for px in row.chunks_exact(CHANNELS).rev() {
                out.extend_from_slice(px);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            seq: self.seq,
            data: Bytes::from(out),
        }
    }

    /// Start drawing on a private copy of this frame.
    pub fn painter(&self) -> Painter {
        Painter {
            width: self.width as i32,
            height: self.height as i32,
            seq: self.seq,
            buf: self.data.to_vec(),
        }
    }
}

/// Integer pixel rectangle, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    /// Smallest box holding every point, grown by `padding` on each side.
    /// `None` when there are no points.
    pub fn around(points: &[Point2D], padding: i32) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        // `as` saturates, the padding must too
        Some(Self {
            min_x: (min_x as i32).saturating_sub(padding),
            min_y: (min_y as i32).saturating_sub(padding),
            max_x: (max_x as i32).saturating_add(padding),
            max_y: (max_y as i32).saturating_add(padding),
        })
    }
}

/// Mutable drawing surface over a frame copy. Every write is clipped.
pub struct Painter {
    width: i32,
    height: i32,
    seq: u64,
    buf: Vec<u8>,
}

impl Painter {
    fn put(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.buf[i] = color.0;
        self.buf[i + 1] = color.1;
        self.buf[i + 2] = color.2;
    }

    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let (x0, x1) = (x0.max(0), x1.min(self.width - 1));
        let (y0, y1) = (y0.max(0), y1.min(self.height - 1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.put(x, y, color);
            }
        }
    }

    pub fn dot(&mut self, p: Point2D, radius: i32, color: Rgb) {
        let (cx, cy) = (p.x as i32, p.y as i32);
        self.fill_rect(
            cx.saturating_sub(radius),
            cy.saturating_sub(radius),
            cx.saturating_add(radius),
            cy.saturating_add(radius),
            color,
        );
    }

    /// Rectangle outline drawn inwards from the box edges.
    pub fn stroke_box(&mut self, bbox: &BoundingBox, thickness: i32, color: Rgb) {
        let t = thickness.max(1) - 1;
        let b = bbox;
        self.fill_rect(b.min_x, b.min_y, b.max_x, b.min_y.saturating_add(t), color);
        self.fill_rect(b.min_x, b.max_y.saturating_sub(t), b.max_x, b.max_y, color);
        self.fill_rect(b.min_x, b.min_y, b.min_x.saturating_add(t), b.max_y, color);
        self.fill_rect(b.max_x.saturating_sub(t), b.min_y, b.max_x, b.max_y, color);
    }

    pub fn finish(self) -> Frame {
        Frame {
            width: self.width as u32,
            height: self.height as u32,
            seq: self.seq,
            data: Bytes::from(self.buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        Frame {
            width,
            height,
            seq: 0,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_mirror_flips_rows() {
        let frame = gradient(4, 2);
        let mirrored = frame.mirrored();
        assert_eq!(mirrored.pixel(0, 0), Some(Rgb(3, 0, 7)));
        assert_eq!(mirrored.pixel(3, 1), Some(Rgb(0, 1, 7)));
        assert_eq!(mirrored.mirrored(), frame);
    }

    #[test]
    fn test_bounding_box_padding() {
        let points = [
            Point2D::new(100.4, 50.0),
            Point2D::new(300.0, 20.7),
            Point2D::new(200.0, 400.9),
        ];
        let bbox = BoundingBox::around(&points, 10).unwrap();
        assert_eq!(
            bbox,
            BoundingBox { min_x: 90, min_y: 10, max_x: 310, max_y: 410 }
        );
    }

    #[test]
    fn test_extreme_coordinates_saturate() {
        let points = [Point2D::new(1e12, 5.0), Point2D::new(-1e12, 5.0)];
        let bbox = BoundingBox::around(&points, 10).unwrap();
        assert_eq!((bbox.min_x, bbox.max_x), (i32::MIN, i32::MAX));

        let mut painter = Frame::blank(8, 8, 0).painter();
        painter.dot(Point2D::new(1e12, 1e12), 3, Rgb(1, 2, 3));
        painter.stroke_box(&bbox, 2, Rgb(1, 2, 3));
        // every edge lies outside the frame
        assert_eq!(painter.finish(), Frame::blank(8, 8, 0));
    }

    #[test]
    fn test_bounding_box_empty() {
        assert_eq!(BoundingBox::around(&[], 10), None);
    }

    #[test]
    fn test_stroke_is_clipped() {
        let frame = Frame::blank(20, 20, 3);
        let mut painter = frame.painter();
        painter.stroke_box(
            &BoundingBox { min_x: -5, min_y: 2, max_x: 30, max_y: 12 },
            3,
            Rgb(255, 0, 0),
        );
        let out = painter.finish();

        assert_eq!(out.seq, 3);
        assert_eq!(out.pixel(10, 2), Some(Rgb(255, 0, 0)));
        assert_eq!(out.pixel(10, 4), Some(Rgb(255, 0, 0)));
        assert_eq!(out.pixel(10, 5), Some(Rgb(0, 0, 0)));
        assert_eq!(out.pixel(10, 12), Some(Rgb(255, 0, 0)));
        // the source frame is untouched
        assert_eq!(frame.pixel(10, 2), Some(Rgb(0, 0, 0)));
    }
}
