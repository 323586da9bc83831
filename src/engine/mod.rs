//! # Engine Module
//!
//! The archetype entity store the bridge runs on.
//!
//! This module contains the store's building blocks:
//! - Archetypes and type-erased fragment columns
//! - Generational entity handles and the sharded allocator
//! - Queries and deferred commands
//! - Processors and the stage scheduler
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod component;
pub mod storage;
pub mod entity;
pub mod random;
pub mod archetype;
pub mod query;
pub mod commands;
pub mod systems;
pub mod scheduler;
pub mod manager;
