//! Core types for the Astra DB Rust client.
//!
//! This crate holds the pieces shared by every part of the client: the
//! family-tagged [`error`] model (one error enum covering both the Data API
//! and the DevOps API) and the decimal-safe JSON [`codec`].

#![warn(missing_docs)]

pub mod codec;
pub mod error;

pub use error::{
    error_descriptors, ApiFamily, Error, ErrorDescriptor, Result, TimeoutContext,
    FIXED_SECRET_PLACEHOLDER,
};
