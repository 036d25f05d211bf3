pub mod api;
pub mod classification;
pub mod intent;
pub mod operations;
pub mod schema;

pub use classification::*;
pub use intent::*;
pub use operations::*;
