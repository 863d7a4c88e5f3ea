//! Database access layer
//!
//! The relational store is a collaborator of the auth core: it resolves a
//! principal's identity and roles and holds the credential records. The
//! `AccountStore` trait is the seam the authentication gate depends on.

pub mod service;

pub use service::{AccountFinder, AccountRecord, AccountService, AccountStore, AccountUpdate};
