//! Rectangular coordinate spaces and the affine transforms between them.

/// A row-major 3×3 affine matrix.
///
/// Only the top two rows carry information; the last row is always
/// `[0, 0, 1]`. Composition follows gl-matrix: `a.translate(x, y)` is
/// `a * T(x, y)`, so the right-most operation is applied to a point first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [[f64; 3]; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn from_translation(x: f64, y: f64) -> Self {
        Mat3 {
            m: [[1.0, 0.0, x], [0.0, 1.0, y], [0.0, 0.0, 1.0]],
        }
    }

    pub fn from_scale(sx: f64, sy: f64) -> Self {
        Mat3 {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Returns `self * rhs`.
    pub fn multiply(&self, rhs: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, cell) in out_row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[row][k] * rhs.m[k][col]).sum();
            }
        }
        Mat3 { m: out }
    }

    pub fn translate(self, x: f64, y: f64) -> Mat3 {
        self.multiply(&Mat3::from_translation(x, y))
    }

    pub fn scale(self, sx: f64, sy: f64) -> Mat3 {
        self.multiply(&Mat3::from_scale(sx, sy))
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0][0] * x + self.m[0][1] * y + self.m[0][2],
            self.m[1][0] * x + self.m[1][1] * y + self.m[1][2],
        )
    }

    pub fn scale_x(&self) -> f64 {
        self.m[0][0]
    }

    pub fn translate_x(&self) -> f64 {
        self.m[0][2]
    }
}

/// An axis-aligned rectangle in some abstract coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct View {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl View {
    pub const EMPTY: View = View::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// The matrix mapping coordinates local to `self` into `to`.
    ///
    /// Each axis is scaled independently. Both views must have a non-zero
    /// size on the axes that are used.
    pub fn between(&self, to: &View) -> Mat3 {
        let sx = to.width / self.width;
        let sy = to.height / self.height;
        Mat3 {
            m: [
                [sx, 0.0, to.x - self.x * sx],
                [0.0, sy, to.y - self.y * sy],
                [0.0, 0.0, 1.0],
            ],
        }
    }

    /// Applies `mat` to this rectangle. The origin is transformed as a point,
    /// the size only by the linear part of the matrix.
    pub fn transform(&self, mat: &Mat3) -> View {
        let (x, y) = mat.apply(self.x, self.y);
        View {
            x,
            y,
            width: self.width * mat.m[0][0] + self.height * mat.m[0][1],
            height: self.width * mat.m[1][0] + self.height * mat.m[1][1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn between_same_view_is_identity() {
        let view = View::new(10.0, 5.0, 300.0, 40.0);
        let mat = view.between(&view);
        for row in 0..3 {
            for col in 0..3 {
                assert!(close(mat.m[row][col], Mat3::IDENTITY.m[row][col]));
            }
        }
    }

    #[test]
    fn between_round_trip_returns_original_point() {
        let a = View::new(120.0, -4.0, 5_000.0, 30.0);
        let b = View::new(0.0, 0.0, 812.0, 1.0);
        let there = a.between(&b);
        let back = b.between(&a);

        for &(x, y) in &[(120.0, -4.0), (2_500.5, 11.0), (5_120.0, 26.0), (-300.0, 0.0)] {
            let (bx, by) = there.apply(x, y);
            let (rx, ry) = back.apply(bx, by);
            assert!(close(rx, x), "{rx} != {x}");
            assert!(close(ry, y), "{ry} != {y}");
        }

        let composed = back.multiply(&there);
        let (x, y) = composed.apply(777.0, 3.0);
        assert!(close(x, 777.0) && close(y, 3.0));
    }

    #[test]
    fn between_maps_corners_onto_corners() {
        let a = View::new(100.0, 0.0, 200.0, 1.0);
        let b = View::new(0.0, 0.0, 1_000.0, 1.0);
        let mat = a.between(&b);
        assert!(close(mat.apply(a.left(), 0.0).0, b.left()));
        assert!(close(mat.apply(a.right(), 0.0).0, b.right()));
    }

    #[test]
    fn center_scale_keeps_center_fixed() {
        let view = View::new(0.0, 0.0, 1_000.0, 1.0);
        let center = 400.0;
        let mat = Mat3::from_translation(center, 0.0)
            .scale(0.5, 1.0)
            .translate(-center, 0.0);
        let zoomed = view.transform(&mat);

        assert!(close(zoomed.x, 200.0));
        assert!(close(zoomed.width, 500.0));
        assert!(close(zoomed.height, 1.0));
        // The fraction of the view left of the center is unchanged.
        assert!(close(
            (center - zoomed.x) / zoomed.width,
            (center - view.x) / view.width
        ));
    }
}
