//! Seed utility
//!
//! Writes sample CSV files into the landing bucket so the pipeline has
//! something to load, and optionally invokes the pipeline function right
//! after the upload instead of waiting for the storage notification.

mod seeder;

pub use seeder::{mutate_employees, object_key, NewEmployee, SeedOutcome, SeedVariant, Seeder};
