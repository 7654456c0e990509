pub mod machine;
pub mod state;

pub use machine::ScreenMachine;
pub use state::{transition, Screen, ScreenEvent, SideEffect, Transition};
