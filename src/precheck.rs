//! Structural feasibility screen.
//!
//! Runs against the caller's original collections, never against what the
//! current run has consumed, so the answer for a demand does not depend on
//! allocation order. Passing the screen only means the demand is not
//! *trivially* unschedulable.

use crate::data::{ClassDemand, Instructor, Room, UnscheduledClass, UnscheduledReason};

/// Checks, in order, that a qualified instructor exists, that one of them
/// listed any availability, and that some room seats the class at some slot.
/// The first failing check is reported.
pub fn precheck(
    demand: &ClassDemand,
    instructors: &[Instructor],
    rooms: &[Room],
) -> Result<(), UnscheduledClass> {
    let spec = &demand.required_specialization;
    let mut qualified = instructors.iter().filter(|i| i.teaches(spec)).peekable();

    if qualified.peek().is_none() {
        return Err(UnscheduledClass::new(
            demand,
            UnscheduledReason::NoQualifiedInstructor {
                specialization: spec.clone(),
            },
        ));
    }

    // weak check: listed at some point, not necessarily still free
    if !qualified.any(|i| !i.availability.is_empty()) {
        return Err(UnscheduledClass::new(
            demand,
            UnscheduledReason::NoListedAvailability {
                specialization: spec.clone(),
            },
        ));
    }

    if !rooms.iter().any(|r| r.fits_anywhere(demand.students)) {
        return Err(UnscheduledClass::new(
            demand,
            UnscheduledReason::NoRoomCapacity {
                students: demand.students,
            },
        ));
    }

    Ok(())
}
