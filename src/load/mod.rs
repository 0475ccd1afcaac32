//! Load stage
//!
//! Two strategies feed the warehouse:
//!
//! - **Direct insert** - recreate the target table and insert the
//!   transformed rows in one transaction (a destructive full reload)
//! - **Staged copy** - `COPY INTO` the raw table straight from the stage,
//!   optionally forced or limited to files modified after the last load

mod loader;
mod types;

pub use loader::{to_row, Loader};
pub use types::LoadOutcome;
