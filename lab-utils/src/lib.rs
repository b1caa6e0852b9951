mod hash;
pub use hash::*;
mod index;
pub use index::*;
mod json;
pub use json::*;
mod metric;
pub use metric::*;
mod sampling;
pub use sampling::*;
