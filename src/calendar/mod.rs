//! Calendar - event listing decoder and cache refresh

pub mod decoder;
pub mod sync;

pub use decoder::{decode, EventRecord};
pub use sync::CalendarSync;
