//! Shared helpers.

pub mod testutil;
