//! `sml-gateway`: HTTP front door for the music assistant.
//!
//! Resolves the caller from their session token, enforces the per-caller
//! hourly and daily limits, forwards the question upstream and records
//! usage after a successful answer.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
