//! Calendar data sources.
//!
//! - [`CalendarSource`]: the trait the report pipeline reads calendars through
//! - [`MemorySource`]: calendars held in memory or loaded from a JSON file
//! - [`google::GoogleSource`]: Google Calendar API v3 (feature `google`)
//! - [`ProviderError`]: classified errors shared by all sources

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use source::{BoxFuture, CalendarInfo, CalendarSource, MemorySource};
