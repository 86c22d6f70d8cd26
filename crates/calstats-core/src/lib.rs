//! Core types: events, slots, classification, aggregation, reporting

pub mod aggregate;
pub mod classify;
pub mod error;
pub mod event;
pub mod interval;
pub mod report;
pub mod slots;
pub mod time;
pub mod tracing;

pub use aggregate::{Accumulator, Aggregate, SlotAggregator, SlotMatch, SlotOccupancy, SummaryRow};
pub use classify::{Category, Classifier, DEFAULT_HIRING_MARKER, IgnorePatterns};
pub use error::{CoreError, CoreResult};
pub use event::{Attendee, Creator, Event, EventTime, ResponseStatus};
pub use interval::{EffectiveInterval, resolve_interval};
pub use report::{ReportError, ReportWriter};
pub use slots::{MAX_WINDOW_DAYS, START_TIME_FORMAT, Slot, SlotPlan, WindowLength, generate_slots};
pub use time::TimeWindow;
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
