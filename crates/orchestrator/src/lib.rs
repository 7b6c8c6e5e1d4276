pub mod action;
pub mod cancel;
pub mod council;
pub mod events;
pub mod intent;
pub mod phase;
pub mod pheromind;
pub mod state_machine;
pub mod synthesis;

pub use cancel::CancelToken;
pub use events::StreamEvent;
pub use phase::{PathTaken, Phase};
pub use state_machine::{FinalState, Orchestrator};
