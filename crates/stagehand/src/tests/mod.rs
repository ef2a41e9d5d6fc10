//! Test suites for the stagehand controller.

mod support;
mod unit;
