//! Client code for folio.
//!
//! This crate provides the network seam with its reqwest-backed fetch client,
//! and the offline cache controller that sits between pages and the network.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{
    ClientId, ControlMessage, FetchOutcome, OfflineCacheController, Phase, RegisterOutcome, Registration,
    RegistrationStatus, Served, Source, WorkerConfig, WorkerStatus,
};
