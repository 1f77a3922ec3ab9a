//! Menu catalog service with a cache-aside layer.
//!
//! Layers, outermost first: `infra` (Postgres, HTTP, telemetry), `config`,
//! `application` (catalog services and jobs), `cache` (keys, codec, stores,
//! invalidation), `domain` (records and value types).

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
