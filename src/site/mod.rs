//! Site appearance and metadata.
//!
//! Background style goes through a draft that is previewed live and then
//! committed or rolled back. Title and description commit straight away and
//! are announced on an [`EventBus`] so headers update without a reload.

pub mod bus;
mod manager;
mod metadata;
mod style;

pub use bus::EventBus;
pub use manager::*;
pub use metadata::*;
pub use style::*;
