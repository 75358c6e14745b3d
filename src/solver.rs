use crate::data::{
    AssignmentKind, ClassDemand, Conflict, Instructor, Room, RoomSlot, RunSummary,
    ScheduleEntry, SchedulingInput, SchedulingOutput, Slot, UnscheduledClass, UnscheduledReason,
};
use crate::precheck::precheck;
use crate::verify::verify;
use log::{debug, info, trace, warn};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Result of the greedy pass alone, before verification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    pub entries: Vec<ScheduleEntry>,
    pub conflicts: Vec<Conflict>,
}

/// Runs one full pass: allocation, then the consistency audit over what was committed.
pub fn solve(input: &SchedulingInput) -> SchedulingOutput {
    let start_time = Instant::now();
    info!(
        "Allocating {} demands across {} instructors and {} rooms...",
        input.demands.len(),
        input.instructors.len(),
        input.rooms.len()
    );

    let Allocation {
        entries,
        mut conflicts,
    } = allocate(&input.demands, &input.instructors, &input.rooms);

    let double_bookings = verify(&entries);
    if !double_bookings.is_empty() {
        // the busy-sets should make this impossible
        warn!(
            "Consistency check found {} double bookings after allocation",
            double_bookings.len()
        );
    }
    conflicts.extend(double_bookings);

    let summary = RunSummary::new(input.demands.len(), &entries, &conflicts);
    info!(
        "Scheduled {}/{} classes with {} conflicts in {:.2?}",
        summary.scheduled,
        summary.total_demands,
        conflicts.len(),
        start_time.elapsed()
    );

    SchedulingOutput {
        entries,
        conflicts,
        summary,
    }
}

/// Greedy first-fit allocation.
///
/// Demands are placed largest class first (stable for ties), because big
/// classes have the fewest rooms that can hold them. Each demand takes the
/// first (instructor, slot, room) triple that is still free, walking
/// instructors and rooms in input order and slots in the instructor's listed
/// order. There is no backtracking, so this can leave more classes unscheduled
/// than an optimal assignment would. Given the same input order the result is
/// identical run to run.
///
/// The caller's collections are not touched; room availability is tracked on a
/// private copy.
pub fn allocate(demands: &[ClassDemand], instructors: &[Instructor], rooms: &[Room]) -> Allocation {
    let mut workspace = Workspace::new(rooms);
    let mut allocation = Allocation::default();

    let mut ordered: Vec<&ClassDemand> = demands.iter().collect();
    ordered.sort_by(|a, b| b.students.cmp(&a.students));

    for demand in ordered {
        if let Err(unscheduled) = precheck(demand, instructors, rooms) {
            debug!(
                "{} for {} failed precheck: {}",
                demand.subject_code, demand.section, unscheduled.reason
            );
            allocation
                .conflicts
                .push(Conflict::UnscheduledClass(unscheduled));
            continue;
        }

        match workspace.place(demand, instructors, rooms) {
            Some(entry) => allocation.entries.push(entry),
            None => {
                debug!(
                    "{} for {} has no free triple left",
                    demand.subject_code, demand.section
                );
                allocation
                    .conflicts
                    .push(Conflict::UnscheduledClass(UnscheduledClass::new(
                        demand,
                        UnscheduledReason::NoCommonSlot,
                    )));
            }
        }
    }

    allocation
}

#[derive(Debug, Clone, Copy)]
struct SlotState {
    capacity: u32,
    is_available: bool,
}

impl From<&RoomSlot> for SlotState {
    fn from(slot: &RoomSlot) -> Self {
        Self {
            capacity: slot.capacity,
            is_available: slot.is_available,
        }
    }
}

/// Per-run busy-sets plus the private copy of room slot state.
struct Workspace<'a> {
    instructor_busy: HashSet<(&'a str, &'a Slot)>,
    section_busy: HashSet<(&'a str, &'a Slot)>,
    room_busy: HashSet<(&'a str, &'a Slot)>,
    room_slots: HashMap<(&'a str, &'a Slot), SlotState>,
}

impl<'a> Workspace<'a> {
    fn new(rooms: &'a [Room]) -> Self {
        // later listings of the same slot overwrite earlier ones
        let room_slots = rooms
            .iter()
            .flat_map(|room| {
                room.slots
                    .iter()
                    .map(move |s| ((room.id.as_str(), &s.slot), SlotState::from(s)))
            })
            .collect();

        Self {
            instructor_busy: HashSet::new(),
            section_busy: HashSet::new(),
            room_busy: HashSet::new(),
            room_slots,
        }
    }

    fn place(
        &mut self,
        demand: &'a ClassDemand,
        instructors: &'a [Instructor],
        rooms: &'a [Room],
    ) -> Option<ScheduleEntry> {
        let section = demand.section.as_str();
        let candidate_rooms: Vec<&'a Room> = rooms
            .iter()
            .filter(|r| r.fits_anywhere(demand.students))
            .collect();

        let qualified = instructors
            .iter()
            .filter(|i| i.teaches(&demand.required_specialization));

        for instructor in qualified {
            let teacher = instructor.id.as_str();
            for slot in &instructor.availability {
                if self.instructor_busy.contains(&(teacher, slot))
                    || self.section_busy.contains(&(section, slot))
                {
                    continue;
                }

                for room in candidate_rooms.iter().copied() {
                    let key = (room.id.as_str(), slot);
                    if self.room_busy.contains(&key) {
                        continue;
                    }
                    let Some(state) = self.room_slots.get_mut(&key) else {
                        continue;
                    };
                    if !state.is_available || state.capacity < demand.students {
                        continue;
                    }

                    state.is_available = false;
                    let capacity = state.capacity;
                    self.instructor_busy.insert((teacher, slot));
                    self.section_busy.insert((section, slot));
                    self.room_busy.insert(key);

                    trace!(
                        "{} for {} -> {} in {} at {}",
                        demand.subject_code, section, teacher, room.id, slot
                    );
                    return Some(ScheduleEntry {
                        section: demand.section.clone(),
                        subject_code: demand.subject_code.clone(),
                        subject_name: demand.subject_name.clone(),
                        required_specialization: demand.required_specialization.clone(),
                        instructor: instructor.id.clone(),
                        room: room.id.clone(),
                        slot: slot.clone(),
                        students: demand.students,
                        room_capacity: Some(capacity),
                        kind: AssignmentKind::Auto,
                    });
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Day;

    fn slot(day: Day, time: &str) -> Slot {
        Slot::new(day, time)
    }

    fn teacher(id: &str, spec: &str, slots: &[Slot]) -> Instructor {
        slots
            .iter()
            .cloned()
            .fold(Instructor::new(id).with_specialization(spec), |i, s| {
                i.with_availability(s)
            })
    }

    fn room(id: &str, slots: &[(Slot, u32)]) -> Room {
        slots
            .iter()
            .cloned()
            .fold(Room::new(id), |r, (s, cap)| r.with_slot(s, cap))
    }

    #[test]
    fn test_largest_class_placed_first() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let instructors = vec![teacher("Lim", "CS", &[mon.clone()])];
        let rooms = vec![room("R1", &[(mon.clone(), 50)])];
        let demands = vec![
            ClassDemand::new("A", "CS1", "Intro", "CS", 10),
            ClassDemand::new("B", "CS1", "Intro", "CS", 40),
        ];

        let allocation = allocate(&demands, &instructors, &rooms);
        assert_eq!(allocation.entries.len(), 1);
        assert_eq!(allocation.entries[0].section, "B");
        assert_eq!(allocation.conflicts.len(), 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let instructors = vec![teacher("Lim", "CS", &[mon.clone()])];
        let rooms = vec![room("R1", &[(mon.clone(), 50)])];
        let demands = vec![
            ClassDemand::new("first", "CS1", "Intro", "CS", 20),
            ClassDemand::new("second", "CS1", "Intro", "CS", 20),
        ];

        let allocation = allocate(&demands, &instructors, &rooms);
        assert_eq!(allocation.entries[0].section, "first");
        match &allocation.conflicts[0] {
            Conflict::UnscheduledClass(c) => {
                assert_eq!(c.section, "second");
                assert_eq!(c.reason, UnscheduledReason::NoCommonSlot);
            }
            other => panic!("unexpected conflict {other:?}"),
        }
    }

    #[test]
    fn test_section_cannot_take_two_classes_in_one_slot() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let tue = slot(Day::Tuesday, "8:00-9:00");
        let instructors = vec![
            teacher("Lim", "CS", &[mon.clone()]),
            teacher("Tan", "Math", &[mon.clone(), tue.clone()]),
        ];
        let rooms = vec![
            room("R1", &[(mon.clone(), 50)]),
            room("R2", &[(mon.clone(), 50), (tue.clone(), 50)]),
        ];
        let demands = vec![
            ClassDemand::new("S1", "CS1", "Intro", "CS", 30),
            ClassDemand::new("S1", "MATH1", "Algebra", "Math", 30),
        ];

        let allocation = allocate(&demands, &instructors, &rooms);
        assert_eq!(allocation.entries.len(), 2);
        assert_eq!(allocation.entries[0].slot, mon);
        assert_eq!(allocation.entries[1].slot, tue);
    }

    #[test]
    fn test_unavailable_room_slot_skipped() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let instructors = vec![teacher("Lim", "CS", &[mon.clone()])];
        let mut closed = room("R1", &[(mon.clone(), 50)]);
        closed.slots[0].is_available = false;
        let rooms = vec![closed, room("R2", &[(mon.clone(), 50)])];
        let demands = vec![ClassDemand::new("S1", "CS1", "Intro", "CS", 30)];

        let allocation = allocate(&demands, &instructors, &rooms);
        assert_eq!(allocation.entries[0].room, "R2");
    }

    #[test]
    fn test_slot_specific_capacity_respected() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let tue = slot(Day::Tuesday, "8:00-9:00");
        let instructors = vec![teacher("Lim", "CS", &[mon.clone(), tue.clone()])];
        let rooms = vec![room("Hall", &[(mon.clone(), 20), (tue.clone(), 60)])];
        let demands = vec![ClassDemand::new("S1", "CS1", "Intro", "CS", 45)];

        let allocation = allocate(&demands, &instructors, &rooms);
        let entry = &allocation.entries[0];
        assert_eq!(entry.slot, tue);
        assert_eq!(entry.room_capacity, Some(60));
    }

    #[test]
    fn test_room_outside_instructor_slots_is_not_used() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let tue = slot(Day::Tuesday, "8:00-9:00");
        let instructors = vec![teacher("Lim", "CS", &[mon.clone()])];
        let rooms = vec![room("R1", &[(tue.clone(), 50)])];
        let demands = vec![ClassDemand::new("S1", "CS1", "Intro", "CS", 30)];

        let allocation = allocate(&demands, &instructors, &rooms);
        assert!(allocation.entries.is_empty());
        assert!(matches!(
            &allocation.conflicts[0],
            Conflict::UnscheduledClass(c) if c.reason == UnscheduledReason::NoCommonSlot
        ));
    }

    #[test]
    fn test_second_instructor_used_when_first_is_busy() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let instructors = vec![
            teacher("Lim", "CS", &[mon.clone()]),
            teacher("Tan", "CS", &[mon.clone()]),
        ];
        let rooms = vec![
            room("R1", &[(mon.clone(), 50)]),
            room("R2", &[(mon.clone(), 50)]),
        ];
        let demands = vec![
            ClassDemand::new("S1", "CS1", "Intro", "CS", 30),
            ClassDemand::new("S2", "CS1", "Intro", "CS", 30),
        ];

        let allocation = allocate(&demands, &instructors, &rooms);
        assert_eq!(allocation.entries.len(), 2);
        assert_eq!(allocation.entries[1].instructor, "Tan");
        assert_eq!(allocation.entries[1].room, "R2");
    }

    #[test]
    fn test_input_rooms_untouched() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let instructors = vec![teacher("Lim", "CS", &[mon.clone()])];
        let rooms = vec![room("R1", &[(mon.clone(), 50)])];
        let before = rooms.clone();
        let demands = vec![ClassDemand::new("S1", "CS1", "Intro", "CS", 30)];

        let _ = allocate(&demands, &instructors, &rooms);
        assert_eq!(rooms, before);
    }

    #[test]
    fn test_solve_reports_summary() {
        let mon = slot(Day::Monday, "8:00-9:00");
        let input = SchedulingInput {
            instructors: vec![teacher("Lim", "CS", &[mon.clone()])],
            rooms: vec![room("R1", &[(mon.clone(), 50)])],
            demands: vec![
                ClassDemand::new("S1", "CS1", "Intro", "CS", 30),
                ClassDemand::new("S2", "BIO1", "Biology", "Bio", 30),
            ],
        };

        let output = solve(&input);
        assert_eq!(output.summary.scheduled, 1);
        assert_eq!(output.summary.unscheduled, 1);
        assert_eq!(output.summary.double_bookings, 0);
        assert_eq!(output.summary.success_rate, 50.0);
    }
}
