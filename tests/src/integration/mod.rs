//! Cross-component tests driving the relay through its HTTP surface.

pub mod harness;

mod end_to_end;
mod lifecycle;
