use super::Rect;
use crate::common::*;

/// Bounding box in TLBR format.
///
/// It is serialized as a `[x1, y1, x2, y2]` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Clamp the box into `[0, w] x [0, h]`.
    pub fn clamp_to(&self, h: T, w: T) -> Self {
        let zero = T::zero();
        let clamp = |value: T, upper: T| {
            if value < zero {
                zero
            } else if value > upper {
                upper
            } else {
                value
            }
        };
        Self {
            t: clamp(self.t, h),
            l: clamp(self.l, w),
            b: clamp(self.b, h),
            r: clamp(self.r, w),
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self> {
        let [t, l, h, w] = tlhw;
        let b = t + h;
        let r = l + w;
        Self::try_from_tlbr([t, l, b, r])
    }
}

impl<T> Serialize for TLBR<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_tuple(4)?;
        seq.serialize_element(&self.l)?;
        seq.serialize_element(&self.t)?;
        seq.serialize_element(&self.r)?;
        seq.serialize_element(&self.b)?;
        seq.end()
    }
}

impl<'de, T> Deserialize<'de> for TLBR<T>
where
    T: Deserialize<'de> + Copy + Num + PartialOrd,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x1, y1, x2, y2] = <[T; 4]>::deserialize(deserializer)?;
        Self::try_from_tlbr([y1, x1, y2, x2]).map_err(D::Error::custom)
    }
}
