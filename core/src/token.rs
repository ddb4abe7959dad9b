//! OCR tokens and polygon normalization.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A single OCR detection. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Four points, clockwise from top-left.
    pub polygon: [Point; 4],
    pub text: String,
    pub score: f32,
}

impl Token {
    pub fn new(polygon: [Point; 4], text: impl Into<String>, score: f32) -> Self {
        Self {
            polygon,
            text: text.into(),
            score,
        }
    }

    pub fn x_mid(&self) -> f32 {
        self.polygon.iter().map(|p| p.x).sum::<f32>() / 4.0
    }

    pub fn y_mid(&self) -> f32 {
        self.polygon.iter().map(|p| p.y).sum::<f32>() / 4.0
    }
}

/// One of the polygon encodings a recognizer backend may hand back.
///
/// Normalized into [`Token::polygon`]'s canonical clockwise-from-top-left
/// four-point form.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPolygon {
    /// Four `[x, y]` points, in whatever order the recognizer emits them.
    FourPoints([[f32; 2]; 4]),
    /// `[x1, y1, x2, y2]` — an axis-aligned box, top-left and bottom-right.
    FourScalars([f32; 4]),
    /// `[x1, y1, x2, y2, x3, y3, x4, y4]` — a flattened quad.
    EightScalars([f32; 8]),
    /// Already four clockwise-from-top-left points.
    Normalized([[f32; 2]; 4]),
}

impl RawPolygon {
    pub fn normalize(&self) -> [Point; 4] {
        match self {
            RawPolygon::Normalized(pts) => to_points(*pts),
            RawPolygon::FourPoints(pts) => order_clockwise(to_points(*pts)),
            RawPolygon::EightScalars(v) => order_clockwise([
                Point::new(v[0], v[1]),
                Point::new(v[2], v[3]),
                Point::new(v[4], v[5]),
                Point::new(v[6], v[7]),
            ]),
            RawPolygon::FourScalars([x1, y1, x2, y2]) => {
                let (x1, x2) = (x1.min(*x2), x1.max(*x2));
                let (y1, y2) = (y1.min(*y2), y1.max(*y2));
                [
                    Point::new(x1, y1),
                    Point::new(x2, y1),
                    Point::new(x2, y2),
                    Point::new(x1, y2),
                ]
            }
        }
    }
}

fn to_points(pts: [[f32; 2]; 4]) -> [Point; 4] {
    [
        Point::new(pts[0][0], pts[0][1]),
        Point::new(pts[1][0], pts[1][1]),
        Point::new(pts[2][0], pts[2][1]),
        Point::new(pts[3][0], pts[3][1]),
    ]
}

/// Reorders four arbitrary points into clockwise order starting from the
/// top-left, using the centroid as a pivot.
fn order_clockwise(pts: [Point; 4]) -> [Point; 4] {
    let cx = pts.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f32>() / 4.0;

    let mut ordered = pts;
    ordered.sort_by(|a, b| {
        let angle = |p: &Point| (p.y - cy).atan2(p.x - cx);
        // Start near the top-left: offset the angle so -135deg (top-left
        // relative to centroid) sorts first, then proceed clockwise.
        let norm = |p: &Point| {
            let mut a = angle(p) - (-3.0 * std::f32::consts::FRAC_PI_4);
            while a < 0.0 {
                a += std::f32::consts::TAU;
            }
            a
        };
        norm(a).partial_cmp(&norm(b)).unwrap()
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_scalars_become_axis_aligned_quad() {
        let poly = RawPolygon::FourScalars([10.0, 20.0, 30.0, 40.0]).normalize();
        assert_eq!(poly[0], Point::new(10.0, 20.0));
        assert_eq!(poly[1], Point::new(30.0, 20.0));
        assert_eq!(poly[2], Point::new(30.0, 40.0));
        assert_eq!(poly[3], Point::new(10.0, 40.0));
    }

    #[test]
    fn normalized_passes_through_unchanged() {
        let pts = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let poly = RawPolygon::Normalized(pts).normalize();
        assert_eq!(poly[0], Point::new(0.0, 0.0));
        assert_eq!(poly[2], Point::new(10.0, 10.0));
    }

    #[test]
    fn token_midpoints() {
        let token = Token::new(
            [
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 20.0),
                Point::new(0.0, 20.0),
            ],
            "x",
            0.9,
        );
        assert_eq!(token.x_mid(), 5.0);
        assert_eq!(token.y_mid(), 10.0);
    }
}
