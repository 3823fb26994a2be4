mod controller;
mod machine;
mod phase;

pub use controller::{Collaborators, ControllerOptions, FocusController};
pub use machine::{CycleSnapshot, FocusCycle, Transition};
pub use phase::{CycleDurations, Phase};
