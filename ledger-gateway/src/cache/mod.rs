mod recency;
mod set;

pub use recency::*;
pub use set::*;
