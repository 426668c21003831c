//! Tables of the transit snapshot, see `migration/src/sql`.

pub mod arrival;
pub mod line;
pub mod route;
pub mod route_stop;
pub mod stop;
