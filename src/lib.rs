#![forbid(unsafe_code)]

pub mod chunk;
pub mod cli;
pub mod commands;
pub mod config;
pub mod formats;
pub mod import;
pub mod logging;
pub mod patterns;
pub mod position;
pub mod segment;
pub mod session;
pub mod store;
