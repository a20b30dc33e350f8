pub mod clock;
pub mod handle_race;
pub mod horse;
pub mod orchestrator;
pub mod position;
pub mod program;
pub mod simulation;
pub mod timer;
