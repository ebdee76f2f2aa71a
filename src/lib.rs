//! # corpus-sync
//!
//! Incremental synchronization of categorized, file-based document
//! collections into a persisted, chunked document store.
//!
//! The engine scans configured data sources, fingerprints what it finds,
//! classifies every file as new, modified, deleted, or unchanged relative to
//! the index, and drives the minimal set of delete/update/insert operations
//! needed to make the index match the filesystem — without re-processing
//! unchanged content.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌────────────┐   ┌──────────────┐
//! │ Registry │──▶│ Scanner │──▶│  Detector  │──▶│ Coordinator  │
//! │ sources  │   │ globs   │   │ hash+class │   │ 4 phases     │
//! └──────────┘   └─────────┘   └────────────┘   └──────┬───────┘
//!                                                      │
//!                                        ┌─────────────┼────────────┐
//!                                        ▼             ▼            ▼
//!                                   ┌─────────┐  ┌──────────┐  ┌────────┐
//!                                   │ Chunker │  │ Document │  │  Sync  │
//!                                   │ +Tagger │  │  Index   │  │ Report │
//!                                   └─────────┘  └──────────┘  └────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`registry`] | Data source resolution and health listing |
//! | [`scanner`] | Glob-based file discovery |
//! | [`detect`] | Content fingerprinting and change classification |
//! | [`chunker`] | Fixed-size text chunking with overlap |
//! | [`loader`] | UTF-8 content loading |
//! | [`tagger`] | Deterministic chunk ids and metadata attachment |
//! | [`plan`] | Per-run reconciliation plan |
//! | [`reconcile`] | Phase ordering, execution strategies, failure isolation |
//! | [`report`] | Per-run outcome aggregation |
//! | [`store`] | Document index trait + SQLite and in-memory backends |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema migrations |

pub mod chunker;
pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod plan;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod store;
pub mod tagger;
