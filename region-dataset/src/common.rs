//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, DEFAULT_IOU_EPSILON, TLBR};
pub use futures::stream::{self, Stream, StreamExt as _, TryStreamExt as _};
pub use image::{DynamicImage, GrayImage, Rgb, RgbImage, Rgba};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::{izip, Itertools as _};
pub use label::{Class, Label};
pub use ndarray::{s, Array2, Array3, ArrayView2, Axis};
pub use noisy_float::prelude::*;
pub use par_stream::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Debug,
    fs,
    iter,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
pub use tracing::{debug, info, warn};

pub type Fallible<T> = Result<T, Error>;

unzip_n::unzip_n!(pub 3);
