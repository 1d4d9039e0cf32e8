//! Offline shell tools: drive the worker registration the way a page would.

pub mod client;
pub mod fetch;
pub mod message;
pub mod status;

pub use client::{ShellClientParams, client_impl};
pub use fetch::{ShellFetchParams, fetch_impl};
pub use message::{ShellMessageParams, message_impl};
pub use status::{ShellStatusParams, status_impl};
