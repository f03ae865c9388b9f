pub use anyhow::{ensure, Result};
pub use num_traits::{Num, ToPrimitive, Zero};
pub use serde::{
    de::Error as _, ser::SerializeTuple, Deserialize, Deserializer, Serialize, Serializer,
};
