//! Provider availability: slots, the bookability check and roster
//! generation.
//!
//! A provider's calendar is a set of slots, each either recurring on a
//! weekday or pinned to a specific date. Only `Work` slots make a time
//! bookable; leave or training slots describe the provider's day but never
//! grant availability.

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use ccs_types::HourOfDay;

use crate::error::{ScheduleError, ScheduleResult};
use crate::ids::{ProviderId, SlotId};

/// What a slot means for the provider's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Work,
    Vacation,
    SickLeave,
    Conference,
    Training,
}

/// When a slot applies: every week on a weekday, or on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDay {
    Weekly(Weekday),
    Date(NaiveDate),
}

impl SlotDay {
    /// Whether this slot applies on the given calendar date.
    ///
    /// A weekly slot and a date-specific slot landing on the same day are
    /// equally valid candidates; neither takes precedence.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            SlotDay::Weekly(weekday) => date.weekday() == *weekday,
            SlotDay::Date(specific) => *specific == date,
        }
    }
}

/// One bounded interval of a provider's day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: SlotId,
    pub provider: ProviderId,
    pub day: SlotDay,
    pub start: HourOfDay,
    pub end: HourOfDay,
    pub kind: SlotKind,
    pub note: Option<String>,
}

impl AvailabilitySlot {
    /// Builds a slot, enforcing `end > start`.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::InvalidTimeRange` if the interval is empty or
    /// inverted. Both bounds are already constrained to `[0, 24]` by
    /// [`HourOfDay`].
    pub fn new(
        provider: ProviderId,
        day: SlotDay,
        start: HourOfDay,
        end: HourOfDay,
        kind: SlotKind,
        note: Option<String>,
    ) -> ScheduleResult<Self> {
        if end.as_f64() <= start.as_f64() {
            return Err(ScheduleError::InvalidTimeRange);
        }
        Ok(Self {
            id: SlotId::generate(),
            provider,
            day,
            start,
            end,
            kind,
            note,
        })
    }

    pub fn duration_hours(&self) -> f64 {
        self.end.as_f64() - self.start.as_f64()
    }

    /// Whether the instant's date and time-of-day both fall inside this slot.
    /// Bounds are inclusive, matching how rosters are written (a 09:00-13:00
    /// shift accepts a 13:00 booking).
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        if !self.day.applies_on(instant.date_naive()) {
            return false;
        }
        let hour = fractional_hour(instant);
        hour >= self.start.as_f64() && hour <= self.end.as_f64()
    }
}

/// The instant's time-of-day as fractional hours, to the minute.
pub(crate) fn fractional_hour(instant: DateTime<Utc>) -> f64 {
    f64::from(instant.hour()) + f64::from(instant.minute()) / 60.0
}

/// Combine a calendar date and a fractional hour into a UTC instant.
pub(crate) fn instant_on(date: NaiveDate, hour: HourOfDay) -> DateTime<Utc> {
    let secs = ((hour.as_f64() * 3600.0).round() as u32).min(86_399);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// Finds a work slot of `provider` covering `instant`.
///
/// Every candidate is checked, not just the first match for the day: a
/// provider with split morning/afternoon shifts must still reject a time
/// inside the break gap. Non-work slots never block on their own; only the
/// absence of a covering work slot does.
///
/// # Errors
///
/// Returns `ScheduleError::NoAvailability` when no work slot covers the
/// instant.
pub fn find_bookable_slot<'a, I>(
    slots: I,
    provider: ProviderId,
    instant: DateTime<Utc>,
) -> ScheduleResult<&'a AvailabilitySlot>
where
    I: IntoIterator<Item = &'a AvailabilitySlot>,
{
    slots
        .into_iter()
        .filter(|slot| slot.provider == provider && slot.kind == SlotKind::Work)
        .find(|slot| slot.covers(instant))
        .ok_or(ScheduleError::NoAvailability { provider, instant })
}

/// Which weeks of the plan's range receive slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekCadence {
    /// Every week in the range.
    Every,
    /// Weeks at even offsets from the start week (the 1st, 3rd, ...).
    Even,
    /// Weeks at odd offsets from the start week (the 2nd, 4th, ...).
    Odd,
}

impl WeekCadence {
    fn includes(self, week_index: u32) -> bool {
        match self {
            WeekCadence::Every => true,
            WeekCadence::Even => week_index % 2 == 0,
            WeekCadence::Odd => week_index % 2 == 1,
        }
    }
}

/// A recurring-roster request: working days and hours over a span of weeks,
/// with a daily break splitting each day into two shifts.
#[derive(Debug, Clone)]
pub struct SlotPlan {
    pub provider: ProviderId,
    pub start_week: NaiveDate,
    pub week_count: u32,
    pub cadence: WeekCadence,
    pub weekdays: Vec<Weekday>,
    pub work_start: HourOfDay,
    pub work_end: HourOfDay,
    pub break_start: HourOfDay,
    pub break_end: HourOfDay,
}

impl SlotPlan {
    /// The half-open date span `[start_week, start_week + 7 * week_count)`
    /// this plan covers. Regeneration replaces work slots inside it only.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        (
            self.start_week,
            self.start_week + Duration::days(7 * i64::from(self.week_count)),
        )
    }

    fn validate(&self) -> ScheduleResult<()> {
        if self.work_start.as_f64() >= self.work_end.as_f64() {
            return Err(ScheduleError::InvalidTimeRange);
        }
        if self.break_start.as_f64() >= self.break_end.as_f64() {
            return Err(ScheduleError::InvalidTimeRange);
        }
        if self.weekdays.is_empty() {
            return Err(ScheduleError::InvalidInput(
                "select at least one weekday".into(),
            ));
        }
        if self.week_count == 0 {
            return Err(ScheduleError::InvalidInput(
                "week_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Expands the plan into date-specific work slots.
    ///
    /// Each selected day yields up to two slots: a morning shift
    /// `[work_start, break_start]` when `work_start < break_start` and an
    /// afternoon shift `[break_end, work_end]` when `break_end < work_end`.
    /// An empty window emits nothing, so a break aligned with the start or
    /// end of the day produces a single continuous shift.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimeRange` for inverted work or break windows and
    /// `InvalidInput` when no weekday is selected or the span is empty.
    pub fn generate(&self) -> ScheduleResult<Vec<AvailabilitySlot>> {
        self.validate()?;

        let mut slots = Vec::new();
        for week in 0..self.week_count {
            if !self.cadence.includes(week) {
                continue;
            }
            let week_start = self.start_week + Duration::days(7 * i64::from(week));
            for offset in 0..7 {
                let date = week_start + Duration::days(offset);
                if !self.weekdays.contains(&date.weekday()) {
                    continue;
                }
                if self.work_start.as_f64() < self.break_start.as_f64() {
                    slots.push(AvailabilitySlot::new(
                        self.provider,
                        SlotDay::Date(date),
                        self.work_start,
                        self.break_start,
                        SlotKind::Work,
                        Some("Morning shift".to_owned()),
                    )?);
                }
                if self.break_end.as_f64() < self.work_end.as_f64() {
                    slots.push(AvailabilitySlot::new(
                        self.provider,
                        SlotDay::Date(date),
                        self.break_end,
                        self.work_end,
                        SlotKind::Work,
                        Some("Afternoon shift".to_owned()),
                    )?);
                }
            }
        }
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hour(h: f64) -> HourOfDay {
        HourOfDay::new(h).unwrap()
    }

    fn work_slot(provider: ProviderId, day: SlotDay, start: f64, end: f64) -> AvailabilitySlot {
        AvailabilitySlot::new(provider, day, hour(start), hour(end), SlotKind::Work, None).unwrap()
    }

    // 2025-06-02 is a Monday.
    fn monday_at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    #[test]
    fn slot_rejects_inverted_range() {
        let p = ProviderId::generate();
        let err = AvailabilitySlot::new(
            p,
            SlotDay::Weekly(Weekday::Mon),
            hour(13.0),
            hour(9.0),
            SlotKind::Work,
            None,
        );
        assert!(matches!(err, Err(ScheduleError::InvalidTimeRange)));
    }

    #[test]
    fn weekly_slot_covers_matching_weekday_and_hours() {
        let p = ProviderId::generate();
        let slot = work_slot(p, SlotDay::Weekly(Weekday::Mon), 9.0, 13.0);

        assert!(slot.covers(monday_at(10, 0)));
        assert!(slot.covers(monday_at(9, 0)));
        assert!(slot.covers(monday_at(13, 0)));
        assert!(!slot.covers(monday_at(14, 0)));
        // Tuesday same hours
        assert!(!slot.covers(Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap()));
    }

    #[test]
    fn date_slot_covers_only_that_date() {
        let p = ProviderId::generate();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let slot = work_slot(p, SlotDay::Date(date), 9.0, 13.0);

        assert!(slot.covers(monday_at(10, 0)));
        assert!(!slot.covers(Utc.with_ymd_and_hms(2025, 6, 9, 10, 0, 0).unwrap()));
    }

    #[test]
    fn validator_checks_every_candidate_not_just_the_first() {
        let p = ProviderId::generate();
        // Split shift with a 13:00-14:00 break gap.
        let slots = vec![
            work_slot(p, SlotDay::Weekly(Weekday::Mon), 9.0, 13.0),
            work_slot(p, SlotDay::Weekly(Weekday::Mon), 14.0, 17.0),
        ];

        assert!(find_bookable_slot(&slots, p, monday_at(10, 0)).is_ok());
        assert!(find_bookable_slot(&slots, p, monday_at(15, 30)).is_ok());
        // Inside the break: a same-day slot exists but none covers it.
        assert!(matches!(
            find_bookable_slot(&slots, p, monday_at(13, 30)),
            Err(ScheduleError::NoAvailability { .. })
        ));
    }

    #[test]
    fn non_work_slots_never_grant_availability() {
        let p = ProviderId::generate();
        let vacation = AvailabilitySlot::new(
            p,
            SlotDay::Weekly(Weekday::Mon),
            hour(9.0),
            hour(17.0),
            SlotKind::Vacation,
            None,
        )
        .unwrap();

        assert!(matches!(
            find_bookable_slot([&vacation], p, monday_at(10, 0)),
            Err(ScheduleError::NoAvailability { .. })
        ));
    }

    #[test]
    fn validator_ignores_other_providers() {
        let p = ProviderId::generate();
        let other = ProviderId::generate();
        let slots = vec![work_slot(other, SlotDay::Weekly(Weekday::Mon), 9.0, 17.0)];

        assert!(find_bookable_slot(&slots, p, monday_at(10, 0)).is_err());
    }

    #[test]
    fn mixed_weekly_and_date_slots_are_a_union_of_coverage() {
        let p = ProviderId::generate();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let slots = vec![
            work_slot(p, SlotDay::Weekly(Weekday::Mon), 9.0, 12.0),
            // One-off extra evening hours the same Monday.
            work_slot(p, SlotDay::Date(date), 18.0, 20.0),
        ];

        assert!(find_bookable_slot(&slots, p, monday_at(10, 0)).is_ok());
        assert!(find_bookable_slot(&slots, p, monday_at(19, 0)).is_ok());
        assert!(find_bookable_slot(&slots, p, monday_at(15, 0)).is_err());
    }

    #[test]
    fn plan_generates_two_shifts_per_selected_day() {
        let p = ProviderId::generate();
        let plan = SlotPlan {
            provider: p,
            start_week: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            week_count: 1,
            cadence: WeekCadence::Every,
            weekdays: vec![Weekday::Mon, Weekday::Wed],
            work_start: hour(9.0),
            work_end: hour(17.0),
            break_start: hour(13.0),
            break_end: hour(14.0),
        };

        let slots = plan.generate().unwrap();
        assert_eq!(slots.len(), 4);
        assert!(slots.iter().all(|s| s.kind == SlotKind::Work));
        assert!(slots
            .iter()
            .all(|s| matches!(s.day, SlotDay::Date(_))));

        let mondays: Vec<_> = slots
            .iter()
            .filter(|s| s.day.applies_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()))
            .collect();
        assert_eq!(mondays.len(), 2);
        assert_eq!(mondays[0].start.as_f64(), 9.0);
        assert_eq!(mondays[0].end.as_f64(), 13.0);
        assert_eq!(mondays[1].start.as_f64(), 14.0);
        assert_eq!(mondays[1].end.as_f64(), 17.0);
    }

    #[test]
    fn plan_omits_empty_shift_windows() {
        let p = ProviderId::generate();
        // Break at the very start of the day: no morning shift.
        let plan = SlotPlan {
            provider: p,
            start_week: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            week_count: 1,
            cadence: WeekCadence::Every,
            weekdays: vec![Weekday::Mon],
            work_start: hour(9.0),
            work_end: hour(17.0),
            break_start: hour(9.0),
            break_end: hour(10.0),
        };

        let slots = plan.generate().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start.as_f64(), 10.0);
        assert_eq!(slots[0].end.as_f64(), 17.0);
    }

    #[test]
    fn cadence_filters_week_parity() {
        let p = ProviderId::generate();
        let base = SlotPlan {
            provider: p,
            start_week: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            week_count: 4,
            cadence: WeekCadence::Even,
            weekdays: vec![Weekday::Mon],
            work_start: hour(9.0),
            work_end: hour(12.0),
            break_start: hour(12.0),
            break_end: hour(13.0),
        };

        // Even offsets: weeks 0 and 2 -> two Mondays, one slot each
        // (the afternoon window is empty).
        let even = base.generate().unwrap();
        assert_eq!(even.len(), 2);
        assert!(even[0].day.applies_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()));
        assert!(even[1].day.applies_on(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()));

        let odd = SlotPlan {
            cadence: WeekCadence::Odd,
            ..base
        };
        let odd = odd.generate().unwrap();
        assert_eq!(odd.len(), 2);
        assert!(odd[0].day.applies_on(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()));
    }

    #[test]
    fn plan_validation_failures() {
        let p = ProviderId::generate();
        let base = SlotPlan {
            provider: p,
            start_week: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            week_count: 1,
            cadence: WeekCadence::Every,
            weekdays: vec![Weekday::Mon],
            work_start: hour(9.0),
            work_end: hour(17.0),
            break_start: hour(13.0),
            break_end: hour(14.0),
        };

        let inverted = SlotPlan {
            work_start: hour(18.0),
            ..base.clone()
        };
        assert!(matches!(
            inverted.generate(),
            Err(ScheduleError::InvalidTimeRange)
        ));

        let inverted_break = SlotPlan {
            break_start: hour(15.0),
            break_end: hour(14.0),
            ..base.clone()
        };
        assert!(matches!(
            inverted_break.generate(),
            Err(ScheduleError::InvalidTimeRange)
        ));

        let no_days = SlotPlan {
            weekdays: vec![],
            ..base
        };
        assert!(matches!(
            no_days.generate(),
            Err(ScheduleError::InvalidInput(_))
        ));
    }

    #[test]
    fn instant_on_builds_utc_datetime() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let instant = instant_on(date, hour(9.5));
        assert_eq!(instant, monday_at(9, 30));
        assert_eq!(fractional_hour(instant), 9.5);
    }
}
