//! API handlers module

pub mod courses;
pub mod generate;
pub mod health;
pub mod topics;
