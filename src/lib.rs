//! Caching layer for an upstream catalog backend. Stores, brands and
//! products are mirrored into Postgres by queue-driven sync jobs; the HTTP
//! API serves the mirror and queues re-syncs.

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod entities;
pub mod health;
pub mod jobs;
pub mod middleware;
pub mod processor;
pub mod repositories;
pub mod seeker;
pub mod service;
