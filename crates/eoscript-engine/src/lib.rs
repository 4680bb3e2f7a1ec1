//! eoscript Engine
//!
//! Lifecycle and execution of the script engine that turns a composed script
//! into process graphs.
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──▶ Ready
//!                                              └──▶ Failed (terminal)
//! ```
//!
//! - [`ScriptEngine`] is the capability a concrete runtime implements.
//! - [`EngineHost`] wraps one engine: it initializes it at most once, keeps
//!   an ordered log of [`EngineEvent`]s and serializes runs.
//! - [`PythonEngine`] drives an external Python interpreter.

mod error;
mod events;
mod host;
mod python;

pub use error::EngineError;
pub use events::{ChannelNotifier, EngineEvent, EngineLog, EngineNotifier, LogLevel, NoopNotifier};
pub use host::{EngineHost, EngineStatus, ScriptEngine};
pub use python::PythonEngine;
