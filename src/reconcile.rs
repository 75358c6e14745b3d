//! Manual reconciliation after the automatic pass.
//!
//! A [`Timetable`] is the schedule and conflict list of one run, owned by a
//! single writer. Conflicts are resolved by value: each operation takes the
//! conflict record it resolves and, on success, removes the first equal record
//! from the list.
//!
//! Lifecycle of one conflict:
//!
//! ```text
//! Open --force_assign / reassign(checked, ok) / reassign(forced)--> Resolved
//! Open --reassign(checked, rejected)--> Open
//! ```
//!
//! Forced operations skip every constraint and may introduce new double
//! bookings. They leave the timetable flagged until [`Timetable::reverify`]
//! is called.

use crate::data::{
    AssignmentKind, Conflict, Day, InstructorId, Room, RoomId, ScheduleEntry, SchedulingOutput,
    Slot, TimeSlot, UnscheduledClass,
};
use crate::verify::{Collision, collisions, verify};
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("only double bookings can be resolved by reassignment, got: {0}")]
    WrongConflictKind(Box<Conflict>),

    #[error("schedule entry {0} is not one of the classes in this conflict")]
    EntryNotInConflict(usize),

    #[error("conflict is out of date: {0} schedule entries still share its slot")]
    StaleConflict(usize),

    #[error("no changes selected for schedule entry {0}")]
    NoChange(usize),

    #[error("new placement creates conflicts: {}", .0.iter().join(" "))]
    Rejected(Vec<Collision>),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Whether reassignment tests the new placement before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    #[default]
    Checked,
    Forced,
}

/// Where a force-assigned class goes. Taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub instructor: InstructorId,
    pub room: RoomId,
    #[serde(flatten)]
    pub slot: Slot,
}

/// Fields to change on a reassigned entry. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reassignment {
    pub instructor: Option<InstructorId>,
    pub room: Option<RoomId>,
    pub day: Option<Day>,
    pub time_slot: Option<TimeSlot>,
}

/// What an operation changed.
#[must_use = "forced changes must be followed by Timetable::reverify"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub entry_index: usize,
    pub kind: AssignmentKind,
    pub conflict_removed: bool,
    /// Set when the change may have introduced double bookings the conflict
    /// list does not show yet.
    pub needs_verification: bool,
}

/// Schedule and conflicts of one run, as handed to the reconciliation UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub entries: Vec<ScheduleEntry>,
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub needs_verification: bool,
}

impl From<SchedulingOutput> for Timetable {
    fn from(output: SchedulingOutput) -> Self {
        Self {
            entries: output.entries,
            conflicts: output.conflicts,
            needs_verification: false,
        }
    }
}

/// Whether `entry` holds the double-booked key of `conflict`.
fn involves(conflict: &Conflict, entry: &ScheduleEntry) -> bool {
    match conflict {
        Conflict::UnscheduledClass(_) => false,
        Conflict::TeacherDoubleBooked(c) => entry.instructor == c.instructor && entry.slot == c.slot,
        Conflict::RoomDoubleBooked(c) => entry.room == c.room && entry.slot == c.slot,
    }
}

fn capacity_at(rooms: &[Room], room: &str, slot: &Slot) -> Option<u32> {
    rooms
        .iter()
        .find(|r| r.id == room)
        .and_then(|r| r.slot_at(slot))
        .map(|s| s.capacity)
}

impl Timetable {
    pub fn new(entries: Vec<ScheduleEntry>, conflicts: Vec<Conflict>) -> Self {
        Self {
            entries,
            conflicts,
            needs_verification: false,
        }
    }

    /// Places an unscheduled class exactly where the caller says, with no
    /// specialization, capacity or busy-slot check. Cannot fail.
    ///
    /// `rooms` is only consulted to record the room's capacity at the slot.
    pub fn force_assign(
        &mut self,
        conflict: &UnscheduledClass,
        placement: Placement,
        rooms: &[Room],
    ) -> Applied {
        let room_capacity = capacity_at(rooms, &placement.room, &placement.slot);
        let entry = ScheduleEntry {
            section: conflict.section.clone(),
            subject_code: conflict.subject.clone(),
            subject_name: conflict.subject_name.clone(),
            required_specialization: conflict.required_specialization.clone(),
            instructor: placement.instructor,
            room: placement.room,
            slot: placement.slot,
            students: conflict.students,
            room_capacity,
            kind: AssignmentKind::ManualForced,
        };
        warn!(
            "Force assigned {} for {} to {} in {} at {}; re-verify the schedule",
            entry.subject_code, entry.section, entry.instructor, entry.room, entry.slot
        );

        self.entries.push(entry);
        self.needs_verification = true;
        let conflict_removed = self.remove_unscheduled(conflict);

        Applied {
            entry_index: self.entries.len() - 1,
            kind: AssignmentKind::ManualForced,
            conflict_removed,
            needs_verification: true,
        }
    }

    /// Moves one of the entries involved in a double booking.
    ///
    /// In [`Mode::Checked`] the new placement is tested against every other
    /// entry with the instructor, room and section rules; any clash rejects the
    /// call and leaves the timetable untouched. In [`Mode::Forced`] the move is
    /// committed unconditionally.
    pub fn reassign(
        &mut self,
        conflict: &Conflict,
        entry_index: usize,
        change: Reassignment,
        mode: Mode,
        rooms: &[Room],
    ) -> ReconcileResult<Applied> {
        let involved = self.involved_entries(conflict)?;
        if !involved.contains(&entry_index) {
            return Err(ReconcileError::EntryNotInConflict(entry_index));
        }
        if involved.len() < 2 {
            return Err(ReconcileError::StaleConflict(involved.len()));
        }

        let current = &self.entries[entry_index];
        let mut candidate = current.clone();
        if let Some(instructor) = change.instructor {
            candidate.instructor = instructor;
        }
        if let Some(room) = change.room {
            candidate.room = room;
        }
        if let Some(day) = change.day {
            candidate.slot.day = day;
        }
        if let Some(time_slot) = change.time_slot {
            candidate.slot.time_slot = time_slot;
        }

        if candidate.instructor == current.instructor
            && candidate.room == current.room
            && candidate.slot == current.slot
        {
            return Err(ReconcileError::NoChange(entry_index));
        }

        if mode == Mode::Checked {
            let others = self
                .entries
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != entry_index)
                .map(|(_, e)| e);
            let found = collisions(&candidate, others);
            if !found.is_empty() {
                info!(
                    "Rejected move of {} for {}: {} collisions",
                    candidate.subject_code,
                    candidate.section,
                    found.len()
                );
                return Err(ReconcileError::Rejected(found));
            }
        }

        if candidate.room != current.room || candidate.slot != current.slot {
            candidate.room_capacity = capacity_at(rooms, &candidate.room, &candidate.slot);
        }
        candidate.kind = match mode {
            Mode::Checked => AssignmentKind::ManualReconciled,
            Mode::Forced => AssignmentKind::ManualForced,
        };

        // a three-way clash still has two entries colliding after one moves,
        // and other listed conflicts on the moved entry may no longer hold
        let stale_elsewhere = self
            .conflicts
            .iter()
            .any(|c| c != conflict && involves(c, current));
        let needs_verification = mode == Mode::Forced || involved.len() > 2 || stale_elsewhere;
        match mode {
            Mode::Checked => info!(
                "Moved {} for {} to {} in {} at {}",
                candidate.subject_code,
                candidate.section,
                candidate.instructor,
                candidate.room,
                candidate.slot
            ),
            Mode::Forced => warn!(
                "Force moved {} for {} to {} in {} at {}; re-verify the schedule",
                candidate.subject_code,
                candidate.section,
                candidate.instructor,
                candidate.room,
                candidate.slot
            ),
        }

        let kind = candidate.kind;
        self.entries[entry_index] = candidate;
        self.needs_verification |= needs_verification;
        let conflict_removed = self.remove_conflict(conflict);

        Ok(Applied {
            entry_index,
            kind,
            conflict_removed,
            needs_verification,
        })
    }

    /// Indices of the entries sharing the double-booked key of `conflict`.
    pub fn involved_entries(&self, conflict: &Conflict) -> ReconcileResult<Vec<usize>> {
        if conflict.is_unscheduled() {
            return Err(ReconcileError::WrongConflictKind(Box::new(conflict.clone())));
        }
        Ok(self
            .entries
            .iter()
            .positions(|e| involves(conflict, e))
            .collect())
    }

    /// Re-audits the schedule: double-booking conflicts are replaced with what
    /// the verifier finds now, unscheduled classes are kept. Returns the number
    /// of double bookings found.
    pub fn reverify(&mut self) -> usize {
        let found = verify(&self.entries);
        let count = found.len();
        self.conflicts.retain(Conflict::is_unscheduled);
        self.conflicts.extend(found);
        self.needs_verification = false;
        if count > 0 {
            warn!("Schedule has {count} double bookings after manual changes");
        }
        count
    }

    fn remove_unscheduled(&mut self, conflict: &UnscheduledClass) -> bool {
        let position = self
            .conflicts
            .iter()
            .position(|c| matches!(c, Conflict::UnscheduledClass(u) if u == conflict));
        position.map(|i| self.conflicts.remove(i)).is_some()
    }

    fn remove_conflict(&mut self, conflict: &Conflict) -> bool {
        let position = self.conflicts.iter().position(|c| c == conflict);
        position.map(|i| self.conflicts.remove(i)).is_some()
    }
}
