//! Data Models
//!
//! Contains the data structures shared by the services and the HTTP API.

pub mod response;
pub mod settings;

pub use response::*;
pub use settings::*;
