//! Domain models.

pub mod audit;
pub mod grant;
pub mod plan;
pub mod session;
pub mod tenant;
pub mod two_factor;
pub mod user;
