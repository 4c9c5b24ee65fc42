//! Page-cache residency probes and a randomized read generator.

pub mod advice;
pub mod bitmap;
pub mod error;
pub mod page;
pub mod probe;
pub mod random_io;
pub mod report;
pub mod residency;
pub mod slices;
pub mod target;

pub use error::{Error, Result};
pub use report::Reporter;
