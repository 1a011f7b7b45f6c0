pub mod errors;
pub mod expiry;
pub mod models;
pub mod services;
pub mod social;
pub mod stories;
pub mod traits;
