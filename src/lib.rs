//! Library crate for nullgame-controller, exposing modules for binaries and integration tests.

/// Application configuration.
pub mod config;
/// Reconcilers for games and guesses.
pub mod controller;
/// Resource model and object stores.
pub mod dao;
mod dto;
mod error;
/// HTTP routes.
pub mod routes;
/// Dispatch of watch events to reconcilers.
pub mod runtime;
/// Business logic behind the routes.
pub mod services;
/// Shared handler state.
pub mod state;

#[cfg(test)]
mod test_utils;
