pub mod prediction;
pub mod system;

pub use prediction::*;
pub use system::*;
