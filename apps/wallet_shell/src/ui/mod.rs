//! Terminal surface: command parsing and screen rendering.

pub mod input;
pub mod screens;
