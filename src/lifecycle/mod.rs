//! Pure reservation lifecycle rules: calendar, conflicts, transitions and
//! asset status derivation. No I/O happens in this module.

pub mod calendar;
pub mod conflict;
pub mod due;
pub mod status;
pub mod transitions;

pub use calendar::ReferenceCalendar;
pub use conflict::{check_overlap, windows_overlap};
pub use status::{next_status, StatusEvent};
pub use transitions::{AssetStatusChange, Transition, TransitionKind};
