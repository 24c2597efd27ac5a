//! Hardware-backend contract for model latency profiling.
//!
//! A [`Backend`] pairs a [`Compiler`] (model file to device binary) with a
//! [`Profiler`] (device binary to metrics). Hardware targets live in their
//! own crates and plug in by implementing those two traits.

pub mod artifact;
pub mod backend;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod metrics;
pub mod reference;
pub mod shape;
pub mod spec;

pub use artifact::*;
pub use backend::*;
pub use command::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use metrics::*;
pub use shape::*;
pub use spec::*;
