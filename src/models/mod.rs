pub mod card;
pub mod deal;
pub mod seat;
pub mod stats;

pub use card::*;
pub use deal::*;
pub use seat::*;
pub use stats::*;
