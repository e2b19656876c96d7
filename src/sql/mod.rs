//! Safe SQL builder: identifiers from closed enums only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
