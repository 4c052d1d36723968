//! Infrastructure adapters and runtime bootstrap.

pub mod artifacts;
pub mod assets;
pub mod error;
pub mod http;
pub mod renderer;
pub mod telemetry;
