pub mod applicability;
pub mod dedup;
pub mod due_date;
pub mod generation;
pub mod priority;
pub mod schedule;
pub mod weather_opt;

pub use generation::{GenerationOptions, GenerationOutcome, TaskGenerationService};
