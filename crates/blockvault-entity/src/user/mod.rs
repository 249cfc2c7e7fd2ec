//! Principal (user) domain entities.

pub mod model;

pub use model::{CreateUser, User};
