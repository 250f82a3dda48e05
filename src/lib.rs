//! # transit-sync
//!
//! Schema-agnostic open-data ingestion with time-nearest route search.
//!
//! transit-sync ingests semi-structured JSON published by transit agencies —
//! feeds with no fixed schema, where the fields naming a route or a time
//! vary in spelling and nesting depth across sources — and answers one
//! question: for route R, what is the most temporally relevant record?
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌────────────┐   ┌──────────┐
//! │ Source Resolver │──▶│ Normalizer │──▶│  SQLite   │
//! │ URL/File/CKAN   │   │ key+stamp  │   │ generations│
//! └─────────────────┘   └────────────┘   └────┬─────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │ (tsync)  │       │  (axum)  │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! Each successful sync produces a *generation*: a complete record set that
//! atomically replaces the prior one. Queries scan records for route and
//! time fields under a fixed alias set and rank matches by absolute time
//! distance to the query instant.
//!
//! ## Quick Start
//!
//! ```bash
//! tsync init                        # create database
//! tsync sync                        # ingest the configured source
//! tsync search 504 --at 14:30      # time-nearest records for route 504
//! tsync serve                       # HTTP API + periodic sync
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`source`] | Source descriptor resolution (URL, file, catalog) |
//! | [`catalog`] | CKAN-style catalog package lookup |
//! | [`transform`] | Record normalization and key assignment |
//! | [`scan`] | Schema-agnostic field scanning |
//! | [`value`] | Route and timestamp canonicalization |
//! | [`search`] | Time-nearest ranking engine |
//! | [`sync`] | Single-flight ingestion orchestration |
//! | [`server`] | HTTP API server |
//! | [`db`] | Database connection |
//! | [`store`] | Record and audit-trail persistence |
//! | [`migrate`] | Schema migrations |

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod models;
pub mod scan;
pub mod search;
pub mod server;
pub mod source;
pub mod store;
pub mod sync;
pub mod transform;
pub mod value;
