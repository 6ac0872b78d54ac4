//! Chart/video music metadata unification - shared modules for the binaries.

pub mod config;
pub mod dedupe;
pub mod duration;
pub mod error;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod store;
pub mod title_parser;
pub mod unify;
