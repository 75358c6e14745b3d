//! Section timetabling engine.
//!
//! Assigns class demands (section × subject) to (instructor, room, day, time
//! slot) tuples with a deterministic greedy pass, audits the result for double
//! bookings, and supports manual fixes afterwards.
//!
//! ```
//! use section_scheduler::data::{ClassDemand, Day, Instructor, Room, SchedulingInput, Slot};
//! use section_scheduler::solver::solve;
//!
//! let nine = Slot::new(Day::Monday, "9:00-10:00");
//! let input = SchedulingInput {
//!     instructors: vec![Instructor::new("Santos").with_specialization("Math").with_availability(nine.clone())],
//!     rooms: vec![Room::new("R101").with_slot(nine, 30)],
//!     demands: vec![ClassDemand::new("BSED-1A", "MATH101", "College Algebra", "Math", 25)],
//! };
//! let output = solve(&input);
//! assert_eq!(output.entries.len(), 1);
//! assert!(output.conflicts.is_empty());
//! ```

pub mod data;
pub mod precheck;
pub mod reconcile;
pub mod server;
pub mod solver;
pub mod verify;
