//! Scrivano: a self-hosted handwriting-synthesis HTTP service.
//!
//! The library crate exposes the three layers (domain, application, infra) so
//! integration tests can assemble the router with fake collaborators.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
