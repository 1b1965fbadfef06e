pub mod analytics;
pub mod charts;
pub mod config;
pub mod error;
pub mod generator;
pub mod latency;
pub mod loader;
pub mod report;
pub mod svg;
pub mod tui;
pub mod types;
pub mod view;
pub mod web;
