//! Alt+T translation for any web page, backed by a local Ollama server.
//!
//! The browser-independent core lives here: configuration, the Ollama client
//! and its message relay, the activation controller and the text insertion
//! chain. [`web`] wires those to the real DOM when built for `wasm32`; the
//! native binary drives the same core from the command line.

pub mod config;
pub mod controller;
pub mod dom;
pub mod insert;
pub mod logger;
pub mod ollama;
pub mod popup;
pub mod relay;
pub mod status;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
