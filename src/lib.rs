pub mod cli;
pub mod config;
pub mod error;
pub mod get;
pub mod maven;
pub mod repositories;
pub mod resolver;
pub mod util;
