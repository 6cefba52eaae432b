//src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use common::error::{AppError, ErrorKind};
pub use config::{AppState, Config};
