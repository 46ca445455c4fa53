//! Reversal manager.

pub mod service;

#[cfg(test)]
mod reversal_props;

pub use service::{ReversalService, reverse_in};
