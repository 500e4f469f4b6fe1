//! Controller layer: UI events, the inline-edit state machine, and command
//! orchestration.

pub mod edit_list;
pub mod events;
pub mod orchestration;
