// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use tracing::{debug, warn};

use shared_config::SchedulingConfig;

use crate::models::{intervals_overlap, Appointment};

/// Pure slot search over a working-hours calendar.
///
/// All wall-clock math happens in the configured fixed UTC offset; there is no
/// daylight-saving handling.
#[derive(Debug, Clone)]
pub struct SlotFinder {
    config: SchedulingConfig,
}

impl SlotFinder {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    /// Next `count` conflict-free slot starts at or after `reference`, in order.
    ///
    /// Scans at most `max_scan_days` days, so fewer than `count` slots is a
    /// normal result on a saturated calendar.
    pub fn find_slots(
        &self,
        existing: &[Appointment],
        count: usize,
        reference: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        if count == 0 {
            return Vec::new();
        }

        if !self.config.is_valid() {
            warn!("Refusing slot search with invalid scheduling config: {:?}", self.config);
            return Vec::new();
        }

        let slot = Duration::minutes(self.config.slot_minutes);
        let length = Duration::minutes(self.config.appointment_duration_minutes);

        let busy: Vec<(NaiveDateTime, NaiveDateTime)> = existing
            .iter()
            .map(|appointment| (self.to_local(appointment.start), self.to_local(appointment.end)))
            .collect();

        let mut cursor = round_up(self.to_local(reference), self.config.slot_minutes);
        let mut day = cursor.date();
        let mut slots = Vec::with_capacity(count);

        for _ in 0..self.config.max_scan_days {
            let (window_start, window_end) = self.working_window(day);
            let mut candidate = cursor.max(window_start);

            while candidate + length <= window_end && slots.len() < count {
                let candidate_end = candidate + length;
                let conflict = busy
                    .iter()
                    .any(|(start, end)| intervals_overlap(candidate, candidate_end, *start, *end));

                if !conflict {
                    slots.push(self.to_utc(candidate));
                }

                candidate += slot;
            }

            if slots.len() >= count {
                break;
            }

            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
            cursor = self.working_window(day).0;
        }

        debug!(
            "Found {} of {} requested slots from {} ({} existing bookings)",
            slots.len(),
            count,
            reference,
            existing.len()
        );

        slots
    }

    /// True when `[start, start + duration)` sits inside one day's working window.
    pub fn is_within_working_hours(&self, start: DateTime<Utc>, duration_minutes: i64) -> bool {
        let local_start = self.to_local(start);
        let local_end = local_start + Duration::minutes(duration_minutes);
        let (window_start, window_end) = self.working_window(local_start.date());

        local_start >= window_start && local_end <= window_end
    }

    fn working_window(&self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let midnight = day.and_time(NaiveTime::MIN);
        (
            midnight + Duration::hours(i64::from(self.config.work_start_hour)),
            midnight + Duration::hours(i64::from(self.config.work_end_hour)),
        )
    }

    fn offset(&self) -> Duration {
        Duration::minutes(i64::from(self.config.utc_offset_minutes))
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc() + self.offset()
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - self.offset()))
    }
}

/// Round up to the next multiple of `slot_minutes` past midnight. Exact boundaries stay put.
fn round_up(local: NaiveDateTime, slot_minutes: i64) -> NaiveDateTime {
    let slot_seconds = slot_minutes * 60;
    let elapsed = i64::from(local.num_seconds_from_midnight());
    let remainder = elapsed % slot_seconds;
    let nanos = i64::from(local.nanosecond());

    if remainder == 0 && nanos == 0 {
        return local;
    }

    local - Duration::seconds(remainder) - Duration::nanoseconds(nanos) + Duration::seconds(slot_seconds)
}
