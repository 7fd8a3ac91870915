mod app;
mod config;
mod error;
mod logging;

pub use app::run_from_args;
