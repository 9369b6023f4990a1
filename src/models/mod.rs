pub mod fields;
pub mod record;
pub mod paper;

pub use fields::*;
pub use record::*;
pub use paper::*;
