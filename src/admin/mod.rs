//! Database administrative API.
//!
//! The [`client::AdminClient`] trait abstracts over the three commands the
//! bootstrapper issues: `ping`, `replSetGetStatus` and `replSetInitiate`.
//! [`mongo::MongoAdmin`] talks to real nodes through the MongoDB driver;
//! [`simulated::SimulatedCluster`] is an in-process replica set used for
//! rehearsal runs and tests.

pub mod client;
pub mod mongo;
pub mod simulated;

pub use client::{probe_status, AdminClient, CommandReply, StatusProbe};
