pub mod factors;
pub mod fit;

pub use factors::KeypointReprojectionFactor;
pub use fit::*;
