use super::TLBR;
use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Copy + Num + PartialOrd,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    /// Build a rectangle from corner coordinates in `[x1, y1, x2, y2]` order.
    fn try_from_xyxy(xyxy: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized,
    {
        let [x1, y1, x2, y2] = xyxy;
        Self::try_from_tlbr([y1, x1, y2, x2])
    }

    fn from_xyxy(xyxy: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xyxy(xyxy).unwrap()
    }

    /// Build a rectangle from the top-left corner and size in `[x, y, w, h]` order.
    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized,
    {
        let [x, y, w, h] = xywh;
        Self::try_from_tlhw([y, x, h, w])
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn xyxy(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.r(), self.b()]
    }

    fn tlhw(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.h(), self.w()]
    }

    fn area(&self) -> Self::Type {
        self.h() * self.w()
    }

    /// Returns true if the rectangle covers no area.
    fn is_degenerate(&self) -> bool {
        let zero = Self::Type::zero();
        self.h() <= zero || self.w() <= zero
    }

    /// Compute the signed overlap height and width with another rectangle.
    ///
    /// Either component is negative when the rectangles are disjoint.
    fn overlap_hw_with<R>(&self, other: &R) -> [Self::Type; 2]
    where
        R: Rect<Type = Self::Type>,
    {
        let t = max(self.t(), other.t());
        let l = max(self.l(), other.l());
        let b = min(self.b(), other.b());
        let r = min(self.r(), other.r());
        [b - t, r - l]
    }

    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = max(self.t(), other.t());
        let l = max(self.l(), other.l());
        let b = min(self.b(), other.b());
        let r = min(self.r(), other.r());
        (b > t && r > l).then(|| TLBR::from_tlbr([t, l, b, r]))
    }

    /// Compute the intersection over union.
    ///
    /// The `epsilon` is added to the union area so that two empty boxes
    /// yield zero instead of NaN.
    fn iou_with<R>(&self, other: &R, epsilon: f64) -> f64
    where
        R: Rect<Type = Self::Type>,
        Self::Type: ToPrimitive,
    {
        let [h, w] = self.overlap_hw_with(other);
        let zero = Self::Type::zero();
        if h < zero || w < zero {
            return 0.0;
        }

        let to_f64 = |value: Self::Type| value.to_f64().unwrap_or(f64::NAN);
        let inter_area = to_f64(h) * to_f64(w);
        let self_area = to_f64(self.h()) * to_f64(self.w());
        let other_area = to_f64(other.h()) * to_f64(other.w());
        inter_area / (self_area + other_area - inter_area + epsilon)
    }

    /// Per-coordinate offset from this rectangle to the target, in
    /// `[x1, y1, x2, y2]` order.
    fn delta_to<R>(&self, target: &R) -> [Self::Type; 4]
    where
        R: Rect<Type = Self::Type>,
    {
        [
            target.l() - self.l(),
            target.t() - self.t(),
            target.r() - self.r(),
            target.b() - self.b(),
        ]
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Copy + Num + PartialOrd,
{
}

fn max<T: PartialOrd>(lhs: T, rhs: T) -> T {
    if lhs >= rhs {
        lhs
    } else {
        rhs
    }
}

fn min<T: PartialOrd>(lhs: T, rhs: T) -> T {
    if lhs <= rhs {
        lhs
    } else {
        rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn xyxy(coords: [i32; 4]) -> TLBR<i32> {
        TLBR::from_xyxy(coords)
    }

    #[test]
    fn iou_with_itself_is_one() {
        let rect = xyxy([10, 10, 50, 50]);
        assert_abs_diff_eq!(rect.iou_with(&rect, 1e-5), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn iou_of_disjoint_rects_is_zero() {
        let lhs = xyxy([10, 10, 50, 50]);
        let rhs = xyxy([100, 100, 120, 120]);
        assert_eq!(lhs.iou_with(&rhs, 1e-5), 0.0);
        assert_eq!(rhs.iou_with(&lhs, 1e-5), 0.0);
    }

    #[test]
    fn iou_of_touching_rects_is_zero() {
        let lhs = xyxy([0, 0, 10, 10]);
        let rhs = xyxy([10, 0, 20, 10]);
        assert_eq!(lhs.iou_with(&rhs, 1e-5), 0.0);
    }

    #[test]
    fn iou_is_symmetric() {
        let pairs = [
            ([10, 10, 50, 50], [12, 12, 48, 48]),
            ([0, 0, 30, 20], [15, 5, 40, 35]),
            ([3, 7, 9, 11], [1, 1, 8, 8]),
        ];
        for (lhs, rhs) in pairs {
            let lhs = xyxy(lhs);
            let rhs = xyxy(rhs);
            assert_eq!(lhs.iou_with(&rhs, 1e-5), rhs.iou_with(&lhs, 1e-5));
        }
    }

    #[test]
    fn iou_of_nested_rects() {
        let outer = xyxy([10, 10, 50, 50]);
        let inner = xyxy([12, 12, 48, 48]);
        assert_abs_diff_eq!(outer.iou_with(&inner, 1e-5), 0.81, epsilon = 1e-6);
    }

    #[test]
    fn iou_of_empty_rects_is_finite() {
        let rect = xyxy([5, 5, 5, 5]);
        assert_eq!(rect.iou_with(&rect, 1e-5), 0.0);
    }

    #[test]
    fn delta_is_in_xyxy_order() {
        let candidate = xyxy([12, 14, 48, 40]);
        let target = xyxy([10, 10, 50, 50]);
        assert_eq!(candidate.delta_to(&target), [-2, -4, 2, 10]);
    }

    #[test]
    fn degenerate_rects() {
        assert!(xyxy([3, 3, 3, 9]).is_degenerate());
        assert!(xyxy([3, 3, 9, 3]).is_degenerate());
        assert!(!xyxy([3, 3, 4, 4]).is_degenerate());
    }

    #[test]
    fn intersection() {
        let lhs = xyxy([0, 0, 10, 10]);
        let rhs = xyxy([5, 2, 20, 8]);
        assert_eq!(lhs.intersect_with(&rhs), Some(xyxy([5, 2, 10, 8])));
        assert_eq!(lhs.intersect_with(&xyxy([11, 11, 12, 12])), None);
    }
}
