pub mod clock;
pub mod database;
pub mod entities;
pub mod notifier;
pub mod object_store;
pub mod repositories;
pub mod social;
pub mod stories;
pub mod traits;
