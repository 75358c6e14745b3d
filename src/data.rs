use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// Type aliases for clarity
pub type InstructorId = String;
pub type RoomId = String;
pub type SectionId = String;
pub type SubjectCode = String;
pub type Specialization = String;
pub type TimeSlot = String;

/// Teaching day. Serialized upper-case; capitalised names are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Day {
    #[serde(alias = "Monday")]
    Monday,
    #[serde(alias = "Tuesday")]
    Tuesday,
    #[serde(alias = "Wednesday")]
    Wednesday,
    #[serde(alias = "Thursday")]
    Thursday,
    #[serde(alias = "Friday")]
    Friday,
    #[serde(alias = "Saturday")]
    Saturday,
    #[serde(alias = "Sunday")]
    Sunday,
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Day::Monday => "MONDAY",
            Day::Tuesday => "TUESDAY",
            Day::Wednesday => "WEDNESDAY",
            Day::Thursday => "THURSDAY",
            Day::Friday => "FRIDAY",
            Day::Saturday => "SATURDAY",
            Day::Sunday => "SUNDAY",
        };
        f.write_str(name)
    }
}

/// A (day, time-slot) pair. Time slots are opaque labels such as `"9:00-10:00"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub day: Day,
    pub time_slot: TimeSlot,
}

impl Slot {
    pub fn new(day: Day, time_slot: impl Into<TimeSlot>) -> Self {
        Self {
            day,
            time_slot: time_slot.into(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.time_slot)
    }
}

/// An instructor, the slots they could teach in, and what they can teach.
///
/// `availability` lists when the instructor *could* teach. It is never
/// narrowed by what a run assigns; the allocator tracks consumption separately.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: InstructorId,
    #[serde(default)]
    pub availability: Vec<Slot>,
    #[serde(default)]
    pub specializations: BTreeSet<Specialization>,
}

impl Instructor {
    pub fn new(id: impl Into<InstructorId>) -> Self {
        Self {
            id: id.into(),
            availability: Vec::new(),
            specializations: BTreeSet::new(),
        }
    }

    pub fn with_specialization(mut self, specialization: impl Into<Specialization>) -> Self {
        self.specializations.insert(specialization.into());
        self
    }

    /// Adds an available slot. Repeated slots keep their first position.
    pub fn with_availability(mut self, slot: Slot) -> Self {
        if !self.availability.contains(&slot) {
            self.availability.push(slot);
        }
        self
    }

    pub fn teaches(&self, specialization: &str) -> bool {
        self.specializations.contains(specialization)
    }
}

fn slot_open() -> bool {
    true
}

/// Capacity and availability of one room at one slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSlot {
    #[serde(flatten)]
    pub slot: Slot,
    pub capacity: u32,
    #[serde(default = "slot_open")]
    pub is_available: bool,
}

/// A room. Capacity may differ from slot to slot (shared facilities).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    #[serde(default)]
    pub slots: Vec<RoomSlot>,
}

impl Room {
    pub fn new(id: impl Into<RoomId>) -> Self {
        Self {
            id: id.into(),
            slots: Vec::new(),
        }
    }

    pub fn with_slot(mut self, slot: Slot, capacity: u32) -> Self {
        self.slots.push(RoomSlot {
            slot,
            capacity,
            is_available: true,
        });
        self
    }

    /// The listing for `slot`. When a slot is listed more than once the last listing wins.
    pub fn slot_at(&self, slot: &Slot) -> Option<&RoomSlot> {
        self.slots.iter().rev().find(|s| &s.slot == slot)
    }

    /// One listing per slot, the last one where a slot is repeated.
    pub fn listings(&self) -> impl Iterator<Item = &RoomSlot> {
        self.slots.iter().rev().unique_by(|s| s.slot.clone())
    }

    /// Whether any listed slot could seat `students`, ignoring availability.
    pub fn fits_anywhere(&self, students: u32) -> bool {
        self.listings().any(|s| s.capacity >= students)
    }
}

/// One section × subject offering that needs a slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDemand {
    pub section: SectionId,
    pub subject_code: SubjectCode,
    pub subject_name: String,
    pub required_specialization: Specialization,
    pub students: u32,
}

impl ClassDemand {
    pub fn new(
        section: impl Into<SectionId>,
        subject_code: impl Into<SubjectCode>,
        subject_name: impl Into<String>,
        required_specialization: impl Into<Specialization>,
        students: u32,
    ) -> Self {
        Self {
            section: section.into(),
            subject_code: subject_code.into(),
            subject_name: subject_name.into(),
            required_specialization: required_specialization.into(),
            students,
        }
    }
}

/// How an entry came to be in the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentKind {
    Auto,
    ManualForced,
    ManualReconciled,
}

impl AssignmentKind {
    pub fn is_forced(self) -> bool {
        self == AssignmentKind::ManualForced
    }
}

/// Names a class by subject and section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRef {
    pub subject_code: SubjectCode,
    pub section: SectionId,
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.subject_code, self.section)
    }
}

/// A committed assignment of a demand to (instructor, room, slot).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub section: SectionId,
    pub subject_code: SubjectCode,
    pub subject_name: String,
    pub required_specialization: Specialization,
    pub instructor: InstructorId,
    pub room: RoomId,
    #[serde(flatten)]
    pub slot: Slot,
    pub students: u32,
    /// Capacity of the room at this slot when assigned. `None` when a manual
    /// placement targets a slot the room never listed.
    pub room_capacity: Option<u32>,
    pub kind: AssignmentKind,
}

impl ScheduleEntry {
    pub fn class_ref(&self) -> ClassRef {
        ClassRef {
            subject_code: self.subject_code.clone(),
            section: self.section.clone(),
        }
    }
}

/// Why a demand did not make it into the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum UnscheduledReason {
    /// Nobody holds the required specialization.
    NoQualifiedInstructor { specialization: Specialization },
    /// Qualified instructors exist but none listed any availability.
    NoListedAvailability { specialization: Specialization },
    /// No room seats this many students at any slot.
    NoRoomCapacity { students: u32 },
    /// Structurally possible, but earlier commitments left no free triple.
    NoCommonSlot,
}

impl fmt::Display for UnscheduledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnscheduledReason::NoQualifiedInstructor { specialization } => {
                write!(f, "no teacher with specialization {specialization}")
            }
            UnscheduledReason::NoListedAvailability { specialization } => write!(
                f,
                "specialization {specialization} exists but no listed availability"
            ),
            UnscheduledReason::NoRoomCapacity { students } => write!(
                f,
                "no room with sufficient capacity for {students} students"
            ),
            UnscheduledReason::NoCommonSlot => f.write_str(
                "specialization and capacity exist but no common available time slot for teacher, room, and section",
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscheduledClass {
    pub section: SectionId,
    pub subject: SubjectCode,
    pub subject_name: String,
    pub students: u32,
    pub required_specialization: Specialization,
    pub reason: UnscheduledReason,
}

impl UnscheduledClass {
    pub fn new(demand: &ClassDemand, reason: UnscheduledReason) -> Self {
        Self {
            section: demand.section.clone(),
            subject: demand.subject_code.clone(),
            subject_name: demand.subject_name.clone(),
            students: demand.students,
            required_specialization: demand.required_specialization.clone(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDoubleBooking {
    pub instructor: InstructorId,
    #[serde(flatten)]
    pub slot: Slot,
    pub classes_involved: Vec<ClassRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDoubleBooking {
    pub room: RoomId,
    #[serde(flatten)]
    pub slot: Slot,
    pub classes_involved: Vec<ClassRef>,
}

/// Everything that can go wrong in a run, as data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Conflict {
    UnscheduledClass(UnscheduledClass),
    TeacherDoubleBooked(TeacherDoubleBooking),
    RoomDoubleBooked(RoomDoubleBooking),
}

impl Conflict {
    pub fn is_unscheduled(&self) -> bool {
        matches!(self, Conflict::UnscheduledClass(_))
    }

    pub fn is_double_booking(&self) -> bool {
        !self.is_unscheduled()
    }
}

fn join_classes(classes: &[ClassRef]) -> String {
    classes.iter().join(", ")
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::UnscheduledClass(c) => write!(
                f,
                "[Unscheduled Class] {} for {} ({} students): {}",
                c.subject, c.section, c.students, c.reason
            ),
            Conflict::TeacherDoubleBooked(c) => write!(
                f,
                "[Teacher Double Booked] {} at {}: {}",
                c.instructor,
                c.slot,
                join_classes(&c.classes_involved)
            ),
            Conflict::RoomDoubleBooked(c) => write!(
                f,
                "[Room Double Booked] {} at {}: {}",
                c.room,
                c.slot,
                join_classes(&c.classes_involved)
            ),
        }
    }
}

/// The complete input for one allocation run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    pub instructors: Vec<Instructor>,
    pub rooms: Vec<Room>,
    pub demands: Vec<ClassDemand>,
}

/// Headline numbers for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_demands: usize,
    pub scheduled: usize,
    pub unscheduled: usize,
    pub double_bookings: usize,
    /// Percentage of demands that were placed; 100 when there was nothing to place.
    pub success_rate: f64,
}

impl RunSummary {
    pub fn new(total_demands: usize, entries: &[ScheduleEntry], conflicts: &[Conflict]) -> Self {
        let unscheduled = conflicts.iter().filter(|c| c.is_unscheduled()).count();
        let success_rate = if total_demands == 0 {
            100.0
        } else {
            entries.len() as f64 * 100.0 / total_demands as f64
        };
        Self {
            total_demands,
            scheduled: entries.len(),
            unscheduled,
            double_bookings: conflicts.len() - unscheduled,
            success_rate,
        }
    }
}

/// The final output of an allocation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingOutput {
    pub entries: Vec<ScheduleEntry>,
    pub conflicts: Vec<Conflict>,
    pub summary: RunSummary,
}
