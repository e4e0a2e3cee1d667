//! Amor song generation service
//!
//! Turns a user's theme and style tags into a finished song: related lyrics
//! are retrieved from a reference corpus, an LLM drafts Hindi lyrics, and a
//! third-party music API renders the audio, which is polled until ready.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ports;
pub mod routes;
pub mod services;
pub mod telemetry;
