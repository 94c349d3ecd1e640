//! Customer Profile Module
//!
//! One profile per user: contact fields, free-form preferences, and an
//! optional image stored in the public media area.

pub mod handlers;
pub mod models;
pub mod store;
pub mod validate;
