/// Daily agenda grid for the appointment scheduling service.
///
/// This module provides `WorkingHours`, which generates the fixed-width slots
/// of a working day and marks each one free or busy against the bookings of a
/// professional, plus the interval-overlap lookup shared by booking and
/// rescheduling.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{Appointment, TimeSlot, MAX_DURATION_MINUTES};

/// The clinic's daily window and slot granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_minutes: i64,
}

impl Default for WorkingHours {
    /// 08:00 to 18:00 in 30-minute steps.
    fn default() -> Self {
        WorkingHours {
            day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
        }
    }
}

impl WorkingHours {
    /// Create a working window with validation.
    pub fn new(
        day_start: NaiveTime,
        day_end: NaiveTime,
        slot_minutes: i64,
    ) -> Result<Self, SchedulingError> {
        if day_end <= day_start {
            return Err(SchedulingError::invalid("Working day must end after it starts"));
        }
        if slot_minutes <= 0 {
            return Err(SchedulingError::invalid("Slot duration must be positive"));
        }

        Ok(WorkingHours {
            day_start,
            day_end,
            slot_minutes,
        })
    }

    /// Number of slots in a day: the window length divided by the step, rounded up.
    pub fn slots_per_day(&self) -> usize {
        let window = (self.day_end - self.day_start).num_minutes();
        ((window + self.slot_minutes - 1) / self.slot_minutes) as usize
    }

    /// Start and end of the window on a given date.
    pub fn window(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.day_start), date.and_time(self.day_end))
    }

    /// Range of appointment start times that can reach into the window of `date`.
    pub fn lookup_range(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let (start, end) = self.window(date);
        (start - Duration::minutes(MAX_DURATION_MINUTES), end)
    }

    /// Generate the slot start times for a single day.
    pub fn generate_daily_slots(&self, date: NaiveDate) -> Vec<NaiveDateTime> {
        let (mut current, end) = self.window(date);
        let step = Duration::minutes(self.slot_minutes);
        let mut slots = Vec::with_capacity(self.slots_per_day());

        while current < end {
            slots.push(current);
            current += step;
        }

        slots
    }

    /// Build the free/busy grid of `date` against a professional's bookings.
    ///
    /// A slot is free only if it lies strictly after `now` and no
    /// agenda-blocking booking contains its start instant.
    pub fn availability(
        &self,
        date: NaiveDate,
        bookings: &[Appointment],
        now: NaiveDateTime,
    ) -> Vec<TimeSlot> {
        self.generate_daily_slots(date)
            .into_iter()
            .map(|start| TimeSlot {
                start,
                available: is_slot_free(start, bookings, now),
            })
            .collect()
    }
}

pub fn is_slot_free(start: NaiveDateTime, bookings: &[Appointment], now: NaiveDateTime) -> bool {
    if start <= now {
        return false;
    }
    !bookings
        .iter()
        .any(|apt| apt.status.blocks_agenda() && apt.contains(start))
}

/// Find the first agenda-blocking booking that overlaps `[start, start + duration)`.
pub fn find_overlap<'a>(
    bookings: &'a [Appointment],
    start: NaiveDateTime,
    duration_minutes: i64,
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    bookings.iter().find(|apt| {
        Some(apt.id) != exclude
            && apt.status.blocks_agenda()
            && apt.overlaps(start, duration_minutes)
    })
}
