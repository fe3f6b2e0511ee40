//! End-to-end tests for embedding into fabricated compiled executables.

mod harness;

mod builder;
mod layout;
mod reader;
