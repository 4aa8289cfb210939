//! Test suites for the gateway transport.

mod behaviour;
mod support;
