//! Carpark finder server.
//!
//! An HTTP service that answers: "where can I park near here, and is there
//! space?" using the NSW Transport carpark API.

pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod logging;
pub mod service;
pub mod upstream;
pub mod web;
