//! replset-bootstrap library: brings three standalone MongoDB nodes up as
//! an initiated replica set.
//!
//! The sequence lives in [`bootstrap`]; the database is reached through
//! the [`admin::AdminClient`] trait so the same sequence runs against real
//! nodes or the in-process simulation.

pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod report;
pub mod retry;
pub mod topology;

pub use bootstrap::{exit_code, BootstrapOutcome, BootstrapPlan, Bootstrapper};
