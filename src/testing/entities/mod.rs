//! [`EntityTest`](super::entity::EntityTest) implementations, one per kind
//!
//! Each module adds the kind's remote calls and reconciliation to the
//! declaration type from [`config`](super::config).

mod application;
mod group;
mod preset;
mod project;
mod query;
mod result;
mod role;
mod scan;
mod user;
