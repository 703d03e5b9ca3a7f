pub mod reading;
pub mod value;

pub use reading::{DecodeError, Reading};
pub use value::Measure;
