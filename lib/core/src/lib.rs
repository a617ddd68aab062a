//! Core types and utilities for tenant-gate.
//!
//! This crate provides the foundational types shared by the authorization
//! library and the web service: the caller [`Identity`] and the rootcause
//! based [`Result`] alias.

pub mod error;
pub mod identity;

pub use error::Result;
pub use identity::{Identity, ParseIdentityError};
