mod app;
mod persistence;
mod render;

pub use app::{run_app, Jobs, RunOptions};
