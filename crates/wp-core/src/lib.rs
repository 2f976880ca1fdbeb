//! wp-core: shared foundation for waterplan.
//!
//! Contains:
//! - units (uom SI lengths + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable element identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{WpError, WpResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
