use crate::{Errors, EstimateClose, EPS};

/// Added to the union to keep the IoU ratio finite
pub const IOU_EPS: f32 = 1e-6;

/// Axis-aligned bounding box in the format (x1, y1, x2, y2)
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    _x1: f32,
    _y1: f32,
    _x2: f32,
    _y2: f32,
}

impl BoundingBox {
    /// Constructor. The box is not validated, use [`BoundingBox::validate`] at the boundaries.
    ///
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            _x1: x1,
            _y1: y1,
            _x2: x2,
            _y2: y2,
        }
    }

    pub fn x1(&self) -> f32 {
        self._x1
    }

    pub fn y1(&self) -> f32 {
        self._y1
    }

    pub fn x2(&self) -> f32 {
        self._x2
    }

    pub fn y2(&self) -> f32 {
        self._y2
    }

    pub fn width(&self) -> f32 {
        self._x2 - self._x1
    }

    pub fn height(&self) -> f32 {
        self._y2 - self._y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self._x1 + self._x2) / 2.0, (self._y1 + self._y2) / 2.0)
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self._x1, self._y1, self._x2, self._y2]
    }

    /// Checks that the coordinates are finite and the box is not inverted.
    /// Zero-area boxes are valid.
    ///
    pub fn validate(&self) -> Result<(), Errors> {
        let coords = self.as_array();
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Errors::NonFiniteCoordinate(coords));
        }
        if self.width() < 0.0 || self.height() < 0.0 {
            return Err(Errors::InvertedBox(coords));
        }
        Ok(())
    }

    /// Intersection area, in `f64` to keep large boxes finite
    ///
    pub fn intersection(l: &BoundingBox, r: &BoundingBox) -> f64 {
        let int_width = (l._x2.min(r._x2) as f64 - l._x1.max(r._x1) as f64).max(0.0);
        let int_height = (l._y2.min(r._y2) as f64 - l._y1.max(r._y1) as f64).max(0.0);
        int_width * int_height
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(a: [f32; 4]) -> Self {
        BoundingBox::new(a[0], a[1], a[2], a[3])
    }
}

impl EstimateClose for BoundingBox {
    /// Allows comparing bboxes
    ///
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self._x1 - other._x1).abs() < eps
            && (self._y1 - other._y1).abs() < eps
            && (self._x2 - other._x2).abs() < eps
            && (self._y2 - other._y2).abs() < eps
    }
}

impl PartialEq<Self> for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

fn area_f64(b: &BoundingBox) -> f64 {
    (b._x2 as f64 - b._x1 as f64) * (b._y2 as f64 - b._y1 as f64)
}

/// Intersection over union of two boxes, within `[0.0, 1.0]`.
///
/// Computed in `f64`, so boxes with large finite coordinates do not overflow. Degenerate
/// boxes produce `0.0` against anything.
///
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let intersection = BoundingBox::intersection(a, b);
    let union = area_f64(a) + area_f64(b) - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    let res = intersection / (union + IOU_EPS as f64);
    if res.is_finite() {
        res.clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::{iou, BoundingBox};
    use crate::{Errors, EstimateClose};

    #[test]
    fn test_iou() {
        let bb1 = BoundingBox::new(-1.0, -1.0, 1.0, 1.0);
        let bb2 = BoundingBox::new(-0.9, -0.9, 1.1, 1.1);
        let bb3 = BoundingBox::new(1.0, 1.0, 4.0, 4.0);

        assert!(iou(&bb1, &bb1) > 0.999);
        assert!(iou(&bb2, &bb2) > 0.999);
        assert!(iou(&bb1, &bb2) > 0.8);
        assert!(iou(&bb1, &bb3) < 0.001);
        assert!(iou(&bb2, &bb3) < 0.001);
    }

    #[test]
    fn symmetric() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 2.0, 17.0, 9.0);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        // 5 * 7 / (100 + 84 - 35)
        assert!(iou(&a, &b).almost_same(&(35.0 / 149.0), 1e-5));
    }

    #[test]
    fn disjoint_and_touching() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        let c = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
        assert_eq!(iou(&a, &c), 0.0);
    }

    #[test]
    fn degenerate() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let line = BoundingBox::new(2.0, 2.0, 2.0, 8.0);
        let point = BoundingBox::new(3.0, 3.0, 3.0, 3.0);
        assert_eq!(iou(&a, &line), 0.0);
        assert_eq!(iou(&line, &line), 0.0);
        assert_eq!(iou(&point, &point), 0.0);
        assert!(line.validate().is_ok());
    }

    #[test]
    fn validation() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).validate().is_ok());
        assert_eq!(
            BoundingBox::new(5.0, 0.0, 1.0, 1.0).validate(),
            Err(Errors::InvertedBox([5.0, 0.0, 1.0, 1.0]))
        );
        assert!(matches!(
            BoundingBox::new(0.0, f32::NAN, 1.0, 1.0).validate(),
            Err(Errors::NonFiniteCoordinate(_))
        ));
        assert!(matches!(
            BoundingBox::new(0.0, 0.0, f32::INFINITY, 1.0).validate(),
            Err(Errors::NonFiniteCoordinate(_))
        ));
    }

    #[test]
    fn huge_boxes() {
        let a = BoundingBox::new(-1e20, -1e20, 1e20, 1e20);
        assert!(a.validate().is_ok());
        assert!(iou(&a, &a) > 0.999);

        let b = BoundingBox::new(0.0, -1e20, 1e20, 1e20);
        assert!(iou(&a, &b).almost_same(&0.5, 1e-5));

        let max = BoundingBox::new(-f32::MAX, -f32::MAX, f32::MAX, f32::MAX);
        let v = iou(&max, &a);
        assert!(v.is_finite() && (0.0..=1.0).contains(&v));
        assert!(iou(&max, &max) > 0.999);
    }

    #[test]
    fn geometry() {
        let b = BoundingBox::from([30.0, -10.0, 70.0, 20.0]);
        assert_eq!(b.center(), (50.0, 5.0));
        assert_eq!(b.width(), 40.0);
        assert_eq!(b.height(), 30.0);
        assert_eq!(b.area(), 1200.0);
    }
}
