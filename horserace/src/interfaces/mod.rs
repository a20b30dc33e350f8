pub mod race_event;
pub mod race_state;
