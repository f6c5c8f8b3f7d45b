//! Built-in globals installed into the root environment.

mod console;
mod global;
mod json;
mod math;

pub use console::{inspect, CaptureBuffer, ConsoleSink};

use crate::runtime::Environment;

/// Installs the default globals (console, Math, JSON, constructors, and
/// free functions) into an environment.
pub fn install(env: &Environment, sink: ConsoleSink) {
    console::install(env, sink);
    math::install(env);
    json::install(env);
    global::install(env);
}
