pub mod api;
pub mod app_state;
pub mod classify;
pub mod config;
pub mod crawler;
pub mod credit;
pub mod entities;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod repositories;
pub mod scheduler;
pub mod translate;
