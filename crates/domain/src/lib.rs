//! `sml-domain`: types shared by every crate of the music assistant proxy:
//! the error type, the configuration tree, chat messages and usage records.

pub mod config;
pub mod error;
pub mod message;
pub mod usage;
