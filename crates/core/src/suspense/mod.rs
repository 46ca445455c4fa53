//! Suspense handler for statement lines without a match.

pub mod service;

pub use service::SuspenseService;
