//! Post-hoc audit of a committed schedule.
//!
//! The allocator's busy-sets should make a fresh schedule clean; this pass
//! exists for manual edits and as a guard against allocator regressions.

use crate::data::{
    ClassRef, Conflict, RoomDoubleBooking, ScheduleEntry, Slot, TeacherDoubleBooking,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reports every (instructor, slot) and (room, slot) shared by more than one
/// entry. Entries of every kind take part, forced ones included. Teacher
/// conflicts come first, each group ordered by key.
pub fn verify(entries: &[ScheduleEntry]) -> Vec<Conflict> {
    let teacher_conflicts = entries
        .iter()
        .map(|e| ((e.instructor.as_str(), &e.slot), e.class_ref()))
        .into_group_map()
        .into_iter()
        .filter(|(_, classes)| classes.len() > 1)
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|((instructor, slot), classes_involved)| {
            Conflict::TeacherDoubleBooked(TeacherDoubleBooking {
                instructor: instructor.to_string(),
                slot: slot.clone(),
                classes_involved,
            })
        });

    let room_conflicts = entries
        .iter()
        .map(|e| ((e.room.as_str(), &e.slot), e.class_ref()))
        .into_group_map()
        .into_iter()
        .filter(|(_, classes)| classes.len() > 1)
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|((room, slot), classes_involved)| {
            Conflict::RoomDoubleBooked(RoomDoubleBooking {
                room: room.to_string(),
                slot: slot.clone(),
                classes_involved,
            })
        });

    teacher_conflicts.chain(room_conflicts).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollisionKind {
    Teacher,
    Room,
    Section,
}

/// One clash between a proposed entry and an entry already in the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub kind: CollisionKind,
    /// The instructor, room or section that would be double-booked.
    pub holder: String,
    pub slot: Slot,
    /// The class already occupying the slot.
    pub existing: ClassRef,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ClassRef {
            subject_code,
            section,
        } = &self.existing;
        match self.kind {
            CollisionKind::Teacher => write!(
                f,
                "Teacher Conflict: {} is already scheduled for {} in section {} at {}.",
                self.holder, subject_code, section, self.slot
            ),
            CollisionKind::Room => write!(
                f,
                "Room Conflict: {} is already scheduled for {} in section {} at {}.",
                self.holder, subject_code, section, self.slot
            ),
            CollisionKind::Section => write!(
                f,
                "Section Conflict: {} already has {} scheduled at {}.",
                self.holder, subject_code, self.slot
            ),
        }
    }
}

/// Tests `candidate` against `others` with the instructor, room and section
/// rules. Reports at most one collision per rule, naming the first clashing
/// entry.
pub fn collisions<'a>(
    candidate: &ScheduleEntry,
    others: impl IntoIterator<Item = &'a ScheduleEntry>,
) -> Vec<Collision> {
    let mut teacher = None;
    let mut room = None;
    let mut section = None;

    for other in others {
        if other.slot != candidate.slot {
            continue;
        }
        if teacher.is_none() && other.instructor == candidate.instructor {
            teacher = Some(other);
        }
        if room.is_none() && other.room == candidate.room {
            room = Some(other);
        }
        if section.is_none() && other.section == candidate.section {
            section = Some(other);
        }
    }

    [
        (CollisionKind::Teacher, &candidate.instructor, teacher),
        (CollisionKind::Room, &candidate.room, room),
        (CollisionKind::Section, &candidate.section, section),
    ]
    .into_iter()
    .filter_map(|(kind, holder, clash)| {
        clash.map(|existing| Collision {
            kind,
            holder: holder.clone(),
            slot: candidate.slot.clone(),
            existing: existing.class_ref(),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AssignmentKind, Day};

    fn entry(section: &str, subject: &str, instructor: &str, room: &str, slot: &Slot) -> ScheduleEntry {
        ScheduleEntry {
            section: section.into(),
            subject_code: subject.into(),
            subject_name: subject.into(),
            required_specialization: "Any".into(),
            instructor: instructor.into(),
            room: room.into(),
            slot: slot.clone(),
            students: 20,
            room_capacity: Some(30),
            kind: AssignmentKind::Auto,
        }
    }

    #[test]
    fn test_clean_schedule_has_no_conflicts() {
        let mon = Slot::new(Day::Monday, "9:00-10:00");
        let tue = Slot::new(Day::Tuesday, "9:00-10:00");
        let entries = vec![
            entry("S1", "CS1", "Lim", "R1", &mon),
            entry("S2", "CS2", "Lim", "R1", &tue),
            entry("S3", "CS3", "Tan", "R2", &mon),
        ];
        assert!(verify(&entries).is_empty());
    }

    #[test]
    fn test_teacher_and_room_double_bookings() {
        let mon = Slot::new(Day::Monday, "9:00-10:00");
        let mut forced = entry("S2", "CS2", "Lim", "R1", &mon);
        forced.kind = AssignmentKind::ManualForced;
        let entries = vec![entry("S1", "CS1", "Lim", "R1", &mon), forced];

        let conflicts = verify(&entries);
        assert_eq!(conflicts.len(), 2);
        match &conflicts[0] {
            Conflict::TeacherDoubleBooked(c) => {
                assert_eq!(c.instructor, "Lim");
                assert_eq!(c.slot, mon);
                assert_eq!(
                    c.classes_involved
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                    vec!["CS1 for S1", "CS2 for S2"]
                );
            }
            other => panic!("expected teacher conflict, got {other:?}"),
        }
        assert!(matches!(&conflicts[1], Conflict::RoomDoubleBooked(c) if c.room == "R1"));
    }

    #[test]
    fn test_groups_sorted_by_key() {
        let mon = Slot::new(Day::Monday, "9:00-10:00");
        let entries = vec![
            entry("S1", "CS1", "Zamora", "R9", &mon),
            entry("S2", "CS2", "Zamora", "R8", &mon),
            entry("S3", "CS3", "Abad", "R7", &mon),
            entry("S4", "CS4", "Abad", "R6", &mon),
        ];
        let conflicts = verify(&entries);
        let names: Vec<_> = conflicts
            .iter()
            .map(|c| match c {
                Conflict::TeacherDoubleBooked(t) => t.instructor.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["Abad", "Zamora"]);
    }

    #[test]
    fn test_collisions_report_each_rule_once() {
        let mon = Slot::new(Day::Monday, "9:00-10:00");
        let existing = vec![
            entry("S1", "CS1", "Lim", "R1", &mon),
            entry("S2", "CS2", "Lim", "R2", &mon),
        ];
        let candidate = entry("S1", "CS9", "Lim", "R2", &mon);

        let found = collisions(&candidate, &existing);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].kind, CollisionKind::Teacher);
        assert_eq!(found[0].existing.subject_code, "CS1");
        assert_eq!(found[1].kind, CollisionKind::Room);
        assert_eq!(found[1].existing.subject_code, "CS2");
        assert_eq!(
            found[2].to_string(),
            "Section Conflict: S1 already has CS1 scheduled at MONDAY 9:00-10:00."
        );
    }

    #[test]
    fn test_collisions_ignore_other_slots() {
        let mon = Slot::new(Day::Monday, "9:00-10:00");
        let tue = Slot::new(Day::Tuesday, "9:00-10:00");
        let existing = vec![entry("S1", "CS1", "Lim", "R1", &mon)];
        assert!(collisions(&entry("S1", "CS1", "Lim", "R1", &tue), &existing).is_empty());
    }
}
