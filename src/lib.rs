pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod logging;
pub mod overlap;
pub mod predicate;
pub mod runner;
