pub mod api;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod humanize;
pub mod manager;
pub mod observability;
pub mod tasks;
pub mod urls;
pub mod worker;
