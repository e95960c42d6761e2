pub mod app;
pub mod batch;
pub mod config;
pub mod job;
pub mod model;
pub mod render;
pub mod results;
pub mod runner;
pub mod source;

#[cfg(test)]
mod testing;
