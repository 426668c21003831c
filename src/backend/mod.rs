//! Everything stored in the database: the transactional fill and the queries
//! the API serves.

mod fill;
mod queries;

pub use fill::fill;
pub use queries::{get_lines, get_routes, get_stop, get_stop_lines, get_stop_schedule};
