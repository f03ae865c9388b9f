//! Labeled bounding boxes and the class vocabulary.

use bbox::{Rect, RectNum, TLBR};
use num_traits::Num;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

/// The reserved class name for background regions.
pub const BACKGROUND: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<T, C> Label<TLBR<T>, C>
where
    T: Copy + Num + PartialOrd,
{
    /// Build a label from corner coordinates in `[x1, y1, x2, y2]` order.
    pub fn try_from_xyxy(xyxy: [T; 4], class: C) -> anyhow::Result<Self> {
        Ok(Self {
            rect: TLBR::try_from_xyxy(xyxy)?,
            class,
        })
    }
}

/// The class of a region.
///
/// Background is serialized as the reserved name `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Class {
    Background,
    Object(String),
}

impl Class {
    /// Create an object class. The reserved background name maps to
    /// [Class::Background].
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == BACKGROUND {
            Self::Background
        } else {
            Self::Object(name)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Background => BACKGROUND,
            Self::Object(name) => name,
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self, Self::Background)
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Class {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        anyhow::ensure!(!name.is_empty(), "class name must not be empty");
        Ok(Self::new(name))
    }
}

impl PartialOrd for Class {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Background sorts before every object class. Object classes sort by name.
impl Ord for Class {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Background, Self::Background) => Ordering::Equal,
            (Self::Background, Self::Object(_)) => Ordering::Less,
            (Self::Object(_), Self::Background) => Ordering::Greater,
            (Self::Object(lhs), Self::Object(rhs)) => lhs.cmp(rhs),
        }
    }
}

impl Serialize for Class {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Class {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}
