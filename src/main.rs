mod app;
mod audio;
mod config;
mod error;
mod library;
mod mpris;
mod runtime;
mod tracker;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run().inspect_err(|e| tracing::error!(error = %e, "bookend exited with an error"))
}
