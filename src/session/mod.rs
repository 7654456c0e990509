pub mod coordinator;
pub mod handle;
pub mod state;

pub use coordinator::{SessionCoordinator, SessionParts};
pub use handle::{SessionCommand, SessionHandle};
pub use state::{SessionState, SessionView};
