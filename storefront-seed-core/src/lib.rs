#![doc = "storefront-seed-core: the seeding pipeline behind storefront-seed."]

//! This crate resets a remote document store and blob bucket to a known state
//! and repopulates them from a menu dataset, wiring up the cross-collection
//! references (menu item → category, menu item ↔ customization) as it goes.
//!
//! Backends are reached only through the traits in [`contract`]; the CLI crate
//! supplies the Appwrite implementation, tests use [`memory`] or the mocks.
//!
//! # Usage
//! Build a [`config::SeedConfig`], load a [`dataset::Dataset`], and call
//! [`seed::seed`] (or drive a [`seed::Seeder`] directly).

pub mod config;
pub mod contract;
pub mod create;
pub mod dataset;
pub mod error;
pub mod image;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod memory;
pub mod purge;
pub mod seed;

pub use error::SeedError;

/// Fresh identifier for a new document or file.
///
/// 32 lowercase hex characters, which fits the id rules of the stores we target
/// (at most 36 characters, alphanumeric, not starting with a special character).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
