//! Core business logic for pickup: accounts, the game registry and its
//! membership rules, friendships and direct messages.

pub mod services;

pub use services::*;
