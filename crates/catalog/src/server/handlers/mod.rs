//! Endpoint handlers

pub mod logs;
pub mod search;
pub mod status;
