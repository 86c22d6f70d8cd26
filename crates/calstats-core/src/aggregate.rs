//! Slot occupancy and per-category totals.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use crate::classify::{Category, Classifier};
use crate::error::CoreResult;
use crate::event::Event;
use crate::interval::{EffectiveInterval, resolve_interval};
use crate::slots::Slot;

/// Hours in a full working week; 100% load.
const FULL_WEEK_HOURS: i64 = 40;

/// An event that overlaps a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMatch {
    pub title: String,
    pub category: Category,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Nominal duration of the event, not clipped to the slot.
    pub duration: Duration,
}

/// Everything that overlapped one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOccupancy {
    pub label: String,
    pub matches: Vec<SlotMatch>,
    /// Whether any match is in a counted category.
    pub occupied: bool,
}

impl SlotOccupancy {
    /// Total duration of the matches in `category`.
    pub fn duration(&self, category: Category) -> Duration {
        self.matches
            .iter()
            .filter(|m| m.category == category)
            .fold(Duration::zero(), |acc, m| acc + m.duration)
    }
}

/// Running totals for one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulator {
    durations: [Duration; 6],
    free_slots: usize,
    counted: Duration,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            durations: [Duration::zero(); 6],
            free_slots: 0,
            counted: Duration::zero(),
        }
    }
}

impl Accumulator {
    /// Adds a matched event's duration to its category.
    pub fn add(&mut self, category: Category, duration: Duration) {
        self.durations[category.index()] += duration;
        if category.is_counted() {
            self.counted += duration;
        }
    }

    /// Records a slot with no counted event.
    pub fn add_free_slot(&mut self) {
        self.free_slots += 1;
    }

    pub fn duration(&self, category: Category) -> Duration {
        self.durations[category.index()]
    }

    pub fn free_slots(&self) -> usize {
        self.free_slots
    }

    /// Hiring plus meeting time.
    pub fn counted(&self) -> Duration {
        self.counted
    }

    /// Finalises the totals into a report row.
    pub fn summary(&self, email: impl Into<String>, timezone: impl Into<String>) -> SummaryRow {
        SummaryRow {
            email: email.into(),
            timezone: timezone.into(),
            free_slots: self.free_slots,
            durations: self.durations,
            counted: self.counted,
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub email: String,
    pub timezone: String,
    pub free_slots: usize,
    /// Indexed by [`Category::index`].
    pub durations: [Duration; 6],
    pub counted: Duration,
}

impl SummaryRow {
    /// Counted time as a whole percentage of a 40 hour week, rounded down.
    pub fn load_percent(&self) -> i64 {
        self.counted.num_seconds() * 100 / (FULL_WEEK_HOURS * 3600)
    }

    /// Column values in header order.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(11);
        record.push(self.email.clone());
        record.push(self.timezone.clone());
        record.push(self.free_slots.to_string());
        record.extend(self.durations.iter().map(|d| format_hours(*d)));
        record.push(format_hours(self.counted));
        record.push(format!("{}%", self.load_percent()));
        record
    }
}

fn format_hours(duration: Duration) -> String {
    format!("{:.1}", duration.num_seconds() as f64 / 3600.0)
}

/// The result of aggregating one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub slots: Vec<SlotOccupancy>,
    pub totals: Accumulator,
}

/// Matches events against slots and accumulates totals.
#[derive(Debug, Clone, Copy)]
pub struct SlotAggregator<'a> {
    classifier: Classifier<'a>,
}

impl<'a> SlotAggregator<'a> {
    pub fn new(classifier: Classifier<'a>) -> Self {
        Self { classifier }
    }

    /// Aggregates `events` over `slots`.
    ///
    /// An event overlapping several slots adds its full duration once per
    /// slot. All-day events are skipped.
    ///
    /// # Errors
    ///
    /// Fails on the first event whose times cannot be resolved, before any
    /// totals are produced.
    pub fn aggregate(&self, slots: &[Slot], events: &[Event]) -> CoreResult<Aggregate> {
        let mut resolved: Vec<(&Event, EffectiveInterval, Category)> = Vec::with_capacity(events.len());
        for event in events {
            match resolve_interval(event)? {
                Some(interval) => resolved.push((event, interval, self.classifier.classify(event))),
                None => trace!(event_id = %event.id, title = %event.title, "skipping all-day event"),
            }
        }

        let mut totals = Accumulator::default();
        let mut occupancy = Vec::with_capacity(slots.len());

        for slot in slots {
            let mut matches = Vec::new();
            let mut occupied = false;

            for (event, interval, category) in &resolved {
                if !slot.overlaps(interval.start, interval.end) {
                    continue;
                }
                debug!(
                    slot = %slot.label,
                    title = %event.title,
                    category = %category,
                    duration_minutes = interval.duration.num_minutes(),
                    "event overlaps slot"
                );
                totals.add(*category, interval.duration);
                occupied |= category.is_counted();
                matches.push(SlotMatch {
                    title: event.title.clone(),
                    category: *category,
                    start: interval.start,
                    end: interval.end,
                    duration: interval.duration,
                });
            }

            if !occupied {
                totals.add_free_slot();
            }
            occupancy.push(SlotOccupancy {
                label: slot.label.clone(),
                matches,
                occupied,
            });
        }

        Ok(Aggregate {
            slots: occupancy,
            totals,
        })
    }
}
