//! Ephemeral messages and stories over HTTP - Library exports for testing
//!
//! (c) Softlandia 2025

pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;

use crate::core::expiry::ExpirySweeper;
use crate::core::services::EphemeralMessageService;
use crate::core::social::MySocialService;
use crate::core::stories::EphemeralStoryService;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::notifier::BroadcastChangeNotifier;
use crate::infrastructure::object_store::LocalObjectStore;
use crate::infrastructure::repositories::DbMessageRepository;
use crate::infrastructure::social::DbSocialGraphRepository;
use crate::infrastructure::stories::DbStoryRepository;
use di::{Injectable, ServiceCollection};

/// Registrations shared by the server and the integration tests.
pub fn service_collection() -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services
        .add(DatabaseConnection::singleton())
        .add(DbMessageRepository::scoped())
        .add(DbStoryRepository::scoped())
        .add(DbSocialGraphRepository::scoped())
        .add(EphemeralMessageService::scoped())
        .add(EphemeralStoryService::scoped())
        .add(MySocialService::scoped())
        .add(ExpirySweeper::scoped())
        .add(BroadcastChangeNotifier::singleton())
        .add(SystemClock::singleton())
        .add(LocalObjectStore::singleton());
    services
}
