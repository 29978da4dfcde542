//! Daily check-in reminders.
//!
//! Each reminder gets a stable id when it is created. The schedule keeps
//! that id next to the handle the alarm backend issued, so an alarm firing
//! maps back to its reminder without comparing timestamps.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque id issued by the alarm backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlarmHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInReminder {
    pub id: Uuid,
    /// Local time of day the reminder fires, every day.
    pub time: NaiveTime,
    pub label: String,
}

impl CheckInReminder {
    pub fn new(time: NaiveTime, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            label: label.into(),
        }
    }

    /// First firing strictly after `now`.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error("Alarm backend error: {0}")]
    Scheduler(String),
    #[error("Reminder not found: {0}")]
    UnknownReminder(Uuid),
}

/// Platform alarm backend. Schedules a daily repeating alarm.
pub trait AlarmScheduler {
    fn schedule(&mut self, reminder: &CheckInReminder) -> Result<AlarmHandle, CheckInError>;
    fn cancel(&mut self, handle: AlarmHandle) -> Result<(), CheckInError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    reminder: CheckInReminder,
    handle: AlarmHandle,
}

/// Reminders keyed by id, each with its live alarm handle.
/// `by_handle` is derived from `entries` and rebuilt on deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredSchedule", into = "StoredSchedule")]
pub struct ReminderSchedule {
    entries: BTreeMap<Uuid, Entry>,
    by_handle: BTreeMap<AlarmHandle, Uuid>,
}

#[derive(Serialize, Deserialize)]
struct StoredSchedule {
    entries: BTreeMap<Uuid, Entry>,
}

impl From<StoredSchedule> for ReminderSchedule {
    fn from(stored: StoredSchedule) -> Self {
        let by_handle = stored
            .entries
            .iter()
            .map(|(id, entry)| (entry.handle, *id))
            .collect();
        Self {
            entries: stored.entries,
            by_handle,
        }
    }
}

impl From<ReminderSchedule> for StoredSchedule {
    fn from(schedule: ReminderSchedule) -> Self {
        Self {
            entries: schedule.entries,
        }
    }
}

impl ReminderSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&CheckInReminder> {
        self.entries.get(id).map(|e| &e.reminder)
    }

    pub fn handle_for(&self, id: &Uuid) -> Option<AlarmHandle> {
        self.entries.get(id).map(|e| e.handle)
    }

    /// Schedule a reminder. Re-adding an existing id cancels its old alarm first.
    pub fn add(
        &mut self,
        reminder: CheckInReminder,
        scheduler: &mut dyn AlarmScheduler,
    ) -> Result<AlarmHandle, CheckInError> {
        if let Some(previous) = self.entries.get(&reminder.id) {
            scheduler.cancel(previous.handle)?;
        }
        let handle = scheduler.schedule(&reminder)?;
        tracing::debug!(reminder_id = %reminder.id, time = %reminder.time, ?handle, "Check-in reminder scheduled");
        let id = reminder.id;
        if let Some(previous) = self.entries.insert(id, Entry { reminder, handle }) {
            self.unindex(previous.handle, id);
        }
        self.by_handle.insert(handle, id);
        Ok(handle)
    }

    pub fn remove(
        &mut self,
        id: &Uuid,
        scheduler: &mut dyn AlarmScheduler,
    ) -> Result<CheckInReminder, CheckInError> {
        let entry = self
            .entries
            .get(id)
            .ok_or(CheckInError::UnknownReminder(*id))?;
        scheduler.cancel(entry.handle)?;

        let entry = self
            .entries
            .remove(id)
            .ok_or(CheckInError::UnknownReminder(*id))?;
        self.unindex(entry.handle, *id);
        Ok(entry.reminder)
    }

    /// Re-issue every alarm, e.g. after the device restarts and the
    /// backend has forgotten them. Stale handles are cancelled best-effort.
    pub fn reschedule_all(&mut self, scheduler: &mut dyn AlarmScheduler) -> Result<usize, CheckInError> {
        for entry in self.entries.values_mut() {
            if let Err(e) = scheduler.cancel(entry.handle) {
                tracing::warn!(reminder_id = %entry.reminder.id, "Stale alarm not cancelled: {e}");
            }
            let handle = scheduler.schedule(&entry.reminder)?;
            if self.by_handle.get(&entry.handle) == Some(&entry.reminder.id) {
                self.by_handle.remove(&entry.handle);
            }
            self.by_handle.insert(handle, entry.reminder.id);
            entry.handle = handle;
        }
        tracing::info!(count = self.entries.len(), "Check-in reminders rescheduled");
        Ok(self.entries.len())
    }

    /// The reminder that fires next after `now`, with its firing time.
    /// Ties go to the lowest reminder id.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<(&CheckInReminder, NaiveDateTime)> {
        self.entries
            .values()
            .map(|e| (&e.reminder, e.reminder.next_fire_after(now)))
            .min_by_key(|(reminder, at)| (*at, reminder.id))
    }

    /// Map a fired alarm back to its reminder.
    pub fn reminder_for_handle(&self, handle: AlarmHandle) -> Option<&CheckInReminder> {
        self.by_handle.get(&handle).and_then(|id| self.get(id))
    }

    /// Drop `handle` from the index unless a backend reused it for another reminder.
    fn unindex(&mut self, handle: AlarmHandle, id: Uuid) {
        if self.by_handle.get(&handle) == Some(&id) {
            self.by_handle.remove(&handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::*;

    #[derive(Default)]
    struct RecordingScheduler {
        next: u64,
        active: HashSet<AlarmHandle>,
        fail_schedule: bool,
    }

    impl AlarmScheduler for RecordingScheduler {
        fn schedule(&mut self, _reminder: &CheckInReminder) -> Result<AlarmHandle, CheckInError> {
            if self.fail_schedule {
                return Err(CheckInError::Scheduler("alarm service unavailable".into()));
            }
            self.next += 1;
            let handle = AlarmHandle(self.next);
            self.active.insert(handle);
            Ok(handle)
        }

        fn cancel(&mut self, handle: AlarmHandle) -> Result<(), CheckInError> {
            if self.active.remove(&handle) {
                Ok(())
            } else {
                Err(CheckInError::Scheduler(format!("no alarm {}", handle.0)))
            }
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn on_day(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_time(at(h, m))
    }

    #[test]
    fn add_stores_handle_under_reminder_id() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let reminder = CheckInReminder::new(at(9, 0), "Morning check-in");
        let id = reminder.id;

        let handle = schedule.add(reminder, &mut scheduler).unwrap();
        assert_eq!(schedule.handle_for(&id), Some(handle));
        assert_eq!(schedule.reminder_for_handle(handle).unwrap().id, id);
    }

    #[test]
    fn re_adding_same_id_replaces_alarm() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let mut reminder = CheckInReminder::new(at(9, 0), "Morning");
        let first = schedule.add(reminder.clone(), &mut scheduler).unwrap();

        reminder.time = at(10, 0);
        let second = schedule.add(reminder, &mut scheduler).unwrap();

        assert_ne!(first, second);
        assert_eq!(schedule.len(), 1);
        assert_eq!(scheduler.active.len(), 1);
        assert!(schedule.reminder_for_handle(first).is_none());
    }

    #[test]
    fn reminders_with_same_time_stay_distinct() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let a = schedule.add(CheckInReminder::new(at(9, 0), "A"), &mut scheduler).unwrap();
        let b = schedule.add(CheckInReminder::new(at(9, 0), "B"), &mut scheduler).unwrap();

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.reminder_for_handle(a).unwrap().label, "A");
        assert_eq!(schedule.reminder_for_handle(b).unwrap().label, "B");
    }

    #[test]
    fn remove_cancels_alarm() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let reminder = CheckInReminder::new(at(20, 0), "Evening");
        let id = reminder.id;
        schedule.add(reminder, &mut scheduler).unwrap();

        let removed = schedule.remove(&id, &mut scheduler).unwrap();
        assert_eq!(removed.label, "Evening");
        assert!(schedule.is_empty());
        assert!(scheduler.active.is_empty());
    }

    #[test]
    fn remove_unknown_id_fails() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let err = schedule.remove(&Uuid::new_v4(), &mut scheduler).unwrap_err();
        assert!(matches!(err, CheckInError::UnknownReminder(_)));
    }

    #[test]
    fn reschedule_all_issues_fresh_handles() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let old = schedule.add(CheckInReminder::new(at(9, 0), "A"), &mut scheduler).unwrap();
        schedule.add(CheckInReminder::new(at(21, 0), "B"), &mut scheduler).unwrap();

        // Backend lost its alarms.
        scheduler.active.clear();

        assert_eq!(schedule.reschedule_all(&mut scheduler).unwrap(), 2);
        assert_eq!(scheduler.active.len(), 2);
        assert!(schedule.reminder_for_handle(old).is_none());
    }

    #[test]
    fn reschedule_all_surfaces_backend_failure() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        schedule.add(CheckInReminder::new(at(9, 0), "A"), &mut scheduler).unwrap();

        scheduler.fail_schedule = true;
        assert!(schedule.reschedule_all(&mut scheduler).is_err());
    }

    #[test]
    fn handle_lookup_follows_replace_remove_and_reschedule() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let mut morning = CheckInReminder::new(at(9, 0), "Morning");
        let evening = CheckInReminder::new(at(20, 0), "Evening");
        let evening_id = evening.id;
        let first = schedule.add(morning.clone(), &mut scheduler).unwrap();
        schedule.add(evening, &mut scheduler).unwrap();

        morning.label = "Late morning".into();
        let replaced = schedule.add(morning.clone(), &mut scheduler).unwrap();
        assert!(schedule.reminder_for_handle(first).is_none());
        assert_eq!(schedule.reminder_for_handle(replaced).unwrap().label, "Late morning");

        let evening_handle = schedule.handle_for(&evening_id).unwrap();
        schedule.remove(&evening_id, &mut scheduler).unwrap();
        assert!(schedule.reminder_for_handle(evening_handle).is_none());

        schedule.reschedule_all(&mut scheduler).unwrap();
        let fresh = schedule.handle_for(&morning.id).unwrap();
        assert_ne!(fresh, replaced);
        assert!(schedule.reminder_for_handle(replaced).is_none());
        assert_eq!(schedule.reminder_for_handle(fresh).unwrap().id, morning.id);
    }

    #[test]
    fn reschedule_survives_backend_reusing_handles() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let a = CheckInReminder::new(at(9, 0), "A");
        let b = CheckInReminder::new(at(21, 0), "B");
        let (a_id, b_id) = (a.id, b.id);
        schedule.add(a, &mut scheduler).unwrap();
        schedule.add(b, &mut scheduler).unwrap();

        // Restarted backend counts from 1 again.
        scheduler.active.clear();
        scheduler.next = 0;
        schedule.reschedule_all(&mut scheduler).unwrap();

        for id in [a_id, b_id] {
            let handle = schedule.handle_for(&id).unwrap();
            assert_eq!(schedule.reminder_for_handle(handle).unwrap().id, id);
        }
    }

    #[test]
    fn restored_schedule_resolves_handles() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        let handle = schedule
            .add(CheckInReminder::new(at(9, 0), "Morning"), &mut scheduler)
            .unwrap();

        let json = serde_json::to_string(&schedule).unwrap();
        assert!(!json.contains("by_handle"));
        let restored: ReminderSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, schedule);
        assert_eq!(restored.reminder_for_handle(handle).unwrap().label, "Morning");
    }

    #[test]
    fn next_fire_picks_earliest_upcoming() {
        let mut scheduler = RecordingScheduler::default();
        let mut schedule = ReminderSchedule::new();
        schedule.add(CheckInReminder::new(at(9, 0), "Morning"), &mut scheduler).unwrap();
        schedule.add(CheckInReminder::new(at(20, 0), "Evening"), &mut scheduler).unwrap();

        let (reminder, when) = schedule.next_fire_after(on_day(12, 0)).unwrap();
        assert_eq!(reminder.label, "Evening");
        assert_eq!(when, on_day(20, 0));

        // Past the last one today, wraps to tomorrow morning.
        let (reminder, when) = schedule.next_fire_after(on_day(21, 0)).unwrap();
        assert_eq!(reminder.label, "Morning");
        assert_eq!(when, on_day(9, 0) + Duration::days(1));
    }

    #[test]
    fn reminder_at_exactly_now_fires_tomorrow() {
        let reminder = CheckInReminder::new(at(9, 0), "Morning");
        assert_eq!(reminder.next_fire_after(on_day(9, 0)), on_day(9, 0) + Duration::days(1));
    }

    #[test]
    fn empty_schedule_has_no_next_fire() {
        assert!(ReminderSchedule::new().next_fire_after(on_day(0, 0)).is_none());
    }
}
