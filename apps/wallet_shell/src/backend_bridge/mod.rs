//! Backend worker: command queue intake and the tokio runtime owning the session.

pub mod commands;
pub mod runtime;
