//! Half-day work slots.
//!
//! A work day is modelled as twelve hours from the configured start time
//! (07:00 by default), split into a Morning and an Afternoon slot. Slots are
//! generated in the calendar owner's IANA timezone; each day is re-resolved
//! from its wall-clock start so a DST change never shifts the work day.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult};
use crate::time::TimeWindow;

/// Civil-time format of the window start, e.g. `2025/02/03 07:00:00`.
pub const START_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Length of one half-day slot, in hours.
const SLOT_HOURS: i64 = 6;

/// Longest window accepted, in civil days (roughly ten years).
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// How far the analysis window extends from its start.
///
/// The variant also selects how weekends are treated:
///
/// - [`WindowLength::Hours`] is elapsed time. Weekend days fall inside the
///   window and consume it, but generate no slots.
/// - [`WindowLength::BusinessDays`] counts weekdays only. Weekend days are
///   skipped and the window is stretched past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLength {
    /// Elapsed hours from the start.
    Hours(u32),
    /// Number of weekdays that produce slots.
    BusinessDays(u32),
}

impl Default for WindowLength {
    fn default() -> Self {
        Self::Hours(7 * 24)
    }
}

/// One half-day window in the calendar owner's local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Display label, e.g. `Mon Feb 3 Morning`.
    pub label: String,
    /// Start of the slot (inclusive).
    pub start: DateTime<Tz>,
    /// End of the slot (exclusive).
    pub end: DateTime<Tz>,
}

impl Slot {
    /// Checks whether the interval `[start, end)` overlaps this slot.
    ///
    /// An interval ending exactly at the slot start, or starting exactly at
    /// the slot end, does not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end.with_timezone(&Utc) && end > self.start.with_timezone(&Utc)
    }
}

/// Slots for one calendar, together with the window to fetch events for.
#[derive(Debug, Clone)]
pub struct SlotPlan {
    /// The resolved calendar timezone.
    pub timezone: Tz,
    /// Slots in chronological order.
    pub slots: Vec<Slot>,
    /// Window covering every slot; events are fetched for this range.
    pub window: TimeWindow,
}

/// Resolves an IANA timezone identifier.
pub fn parse_timezone(name: &str) -> CoreResult<Tz> {
    name.parse::<Tz>().map_err(|_| CoreError::InvalidTimezone {
        timezone: name.to_string(),
    })
}

/// Generates the work slots for a calendar.
///
/// `start` is a civil date-time in [`START_TIME_FORMAT`], interpreted in
/// `timezone`. The returned window starts at `start` and ends at the later of
/// the nominal window end and the last slot's end.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimezone`] for an unknown zone,
/// [`CoreError::InvalidStartTime`] when `start` does not parse, and
/// [`CoreError::NonexistentLocalTime`] when a day's start falls in a DST gap,
/// and [`CoreError::WindowTooLarge`] when the window exceeds
/// [`MAX_WINDOW_DAYS`] or runs past the last representable date.
pub fn generate_slots(timezone: &str, start: &str, length: WindowLength) -> CoreResult<SlotPlan> {
    let tz = parse_timezone(timezone)?;
    let naive_start = NaiveDateTime::parse_from_str(start, START_TIME_FORMAT).map_err(|source| {
        CoreError::InvalidStartTime {
            input: start.to_string(),
            source,
        }
    })?;
    let window_start = localize(tz, naive_start)?;
    check_length(length)?;

    let mut slots = Vec::new();
    let nominal_end = match length {
        WindowLength::Hours(hours) => {
            let end = window_start
                .clone()
                .checked_add_signed(Duration::hours(i64::from(hours)))
                .ok_or_else(|| too_large(length))?;
            let mut offset = 0;
            loop {
                let day = day_start(tz, naive_start, offset)?;
                if day >= end {
                    break;
                }
                if is_work_day(&day) {
                    push_work_day(&mut slots, day, length)?;
                }
                offset += 1;
            }
            end
        }
        WindowLength::BusinessDays(days) => {
            let mut emitted = 0;
            let mut offset = 0;
            while emitted < days {
                let day = day_start(tz, naive_start, offset)?;
                if is_work_day(&day) {
                    push_work_day(&mut slots, day, length)?;
                    emitted += 1;
                }
                offset += 1;
            }
            day_start(tz, naive_start, offset)?
        }
    };

    let mut window_end = nominal_end;
    if let Some(last) = slots.last()
        && last.end > window_end
    {
        window_end = last.end.clone();
    }

    tracing::debug!(
        timezone = tz.name(),
        slots = slots.len(),
        start = %window_start,
        end = %window_end,
        "generated work slots"
    );

    Ok(SlotPlan {
        timezone: tz,
        slots,
        window: TimeWindow::between(&window_start, &window_end),
    })
}

fn check_length(length: WindowLength) -> CoreResult<()> {
    let days = match length {
        WindowLength::Hours(hours) => hours.div_ceil(24),
        WindowLength::BusinessDays(days) => days,
    };
    if days > MAX_WINDOW_DAYS {
        return Err(too_large(length));
    }
    Ok(())
}

fn too_large(length: WindowLength) -> CoreError {
    let requested = match length {
        WindowLength::Hours(hours) => format!("{} hours", hours),
        WindowLength::BusinessDays(days) => format!("{} business days", days),
    };
    CoreError::WindowTooLarge {
        requested,
        max_days: MAX_WINDOW_DAYS,
    }
}

/// Resolves the wall-clock start `offset` civil days after `naive_start`.
fn day_start(tz: Tz, naive_start: NaiveDateTime, offset: u64) -> CoreResult<DateTime<Tz>> {
    let naive = naive_start
        .checked_add_days(Days::new(offset))
        .ok_or_else(|| CoreError::NonexistentLocalTime {
            local: format!("{} + {} days", naive_start, offset),
            timezone: tz.name().to_string(),
        })?;
    localize(tz, naive)
}

fn localize(tz: Tz, naive: NaiveDateTime) -> CoreResult<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| CoreError::NonexistentLocalTime {
            local: naive.to_string(),
            timezone: tz.name().to_string(),
        })
}

fn is_work_day(day: &DateTime<Tz>) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

fn push_work_day(slots: &mut Vec<Slot>, day: DateTime<Tz>, length: WindowLength) -> CoreResult<()> {
    let date = day.format("%a %b %-d").to_string();
    let half_day = Duration::hours(SLOT_HOURS);
    let midday = day
        .clone()
        .checked_add_signed(half_day)
        .ok_or_else(|| too_large(length))?;
    let close = midday
        .clone()
        .checked_add_signed(half_day)
        .ok_or_else(|| too_large(length))?;

    slots.push(Slot {
        label: format!("{} Morning", date),
        start: day,
        end: midday,
    });
    slots.push(Slot {
        label: format!("{} Afternoon", date),
        start: midday,
        end: close,
    });
    Ok(())
}
