//! Domain types for Prompter
//!
//! The unit of work dispatched to the runner, and the model budget that
//! shapes every pacing constant the scheduler derives.

mod budget;
mod item;

pub use budget::ModelBudget;
pub use item::WorkItem;
