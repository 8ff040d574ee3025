//! XY smoothing support: per-layer point buffers and nearest-point queries

use crate::geometry::Vec2;

/// Two point buffers reused across layers: the layer being processed and
/// the one before it.
#[derive(Debug, Clone, Default)]
pub struct LayerBuffers {
    slots: [Vec<Vec2>; 2],
    current: usize,
}

impl LayerBuffers {
    /// Previous layer points and the current layer buffer
    pub fn split_mut(&mut self) -> (&[Vec2], &mut Vec<Vec2>) {
        let [a, b] = &mut self.slots;
        if self.current == 0 { (b.as_slice(), a) } else { (a.as_slice(), b) }
    }

    /// Make the current layer the previous one and start an empty layer.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        self.slots[self.current].clear();
    }
}

/// Closest point to `p` on segment `ab` and its distance
pub fn nearest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f64) {
    let ab = b - a;
    let len2 = ab.dot(ab);
    let t = if len2 == 0.0 {
        0.0
    } else {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    };
    let closest = a + ab * t;
    (closest, p.distance_to(closest))
}

/// Closest point to `p` on the open polyline through `points`.
///
/// `None` when fewer than two points form no segment.
pub fn nearest_point_on_polyline(p: Vec2, points: &[Vec2]) -> Option<(Vec2, f64)> {
    points
        .windows(2)
        .map(|seg| nearest_point_on_segment(p, seg[0], seg[1]))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn segment_projection_is_clamped() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);

        let (q, d) = nearest_point_on_segment(Vec2::new(4.0, 3.0), a, b);
        assert_eq!(q, Vec2::new(4.0, 0.0));
        assert_relative_eq!(d, 3.0);

        let (q, d) = nearest_point_on_segment(Vec2::new(-3.0, 4.0), a, b);
        assert_eq!(q, a);
        assert_relative_eq!(d, 5.0);
    }

    #[test]
    fn degenerate_segment() {
        let a = Vec2::new(1.0, 1.0);
        let (q, d) = nearest_point_on_segment(Vec2::new(1.0, 2.0), a, a);
        assert_eq!(q, a);
        assert_relative_eq!(d, 1.0);
    }

    #[test]
    fn polyline_picks_closest_segment() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let (q, d) = nearest_point_on_polyline(Vec2::new(10.5, 6.0), &square).unwrap();
        assert_eq!(q, Vec2::new(10.0, 6.0));
        assert_relative_eq!(d, 0.5);

        assert!(nearest_point_on_polyline(Vec2::new(1.0, 1.0), &square[..1]).is_none());
    }

    #[test]
    fn buffers_rotate() {
        let mut buffers = LayerBuffers::default();
        buffers.split_mut().1.push(Vec2::new(1.0, 1.0));
        buffers.swap();
        let (previous, current) = buffers.split_mut();
        assert_eq!(previous, &[Vec2::new(1.0, 1.0)]);
        assert!(current.is_empty());

        current.push(Vec2::new(2.0, 2.0));
        buffers.swap();
        let (previous, current) = buffers.split_mut();
        assert_eq!(previous, &[Vec2::new(2.0, 2.0)]);
        assert!(current.is_empty());
    }
}
