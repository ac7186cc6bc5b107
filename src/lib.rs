//! # Codemarks
//!
//! A marker-comment scanning and triage engine for source trees.
//!
//! Codemarks scans a workspace for configurable marker patterns (TODO,
//! FIXME, @audit, and anything else expressible as a regex), indexes each
//! match as a content-addressed annotation, and tracks which annotations
//! have been processed in a durable on-disk ledger. Unprocessed batches
//! can be exported as JSON or delivered to a remote HTTP sink.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌─────────────┐
//! │ Catalog  │──▶│   Scanner    │──▶│ CorpusIndex │
//! │ patterns │   │ regex+lines │   │  per file   │
//! └──────────┘   └─────────────┘   └──────┬──────┘
//!                                         │
//!                     ┌───────────────────┤
//!                     ▼                   ▼
//!                ┌──────────┐       ┌──────────┐
//!                │  Ledger  │◀──────│ Reconcile │
//!                │ (state)  │       │ export/   │
//!                └──────────┘       │ sync      │
//!                                   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cmk scan                      # index marker comments
//! cmk list --unprocessed        # show what is left to triage
//! cmk export --out marks.json   # dump the unprocessed batch
//! cmk sync                      # deliver the batch to the remote sink
//! cmk process                   # mark everything processed
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`catalog`] | Compiled category patterns and ignore rules |
//! | [`identity`] | Content-addressed annotation ids |
//! | [`scanner`] | Regex scanning with line/column mapping |
//! | [`files`] | Workspace file enumeration |
//! | [`index`] | In-memory corpus index and its snapshot |
//! | [`state`] | Durable processed-state ledger |
//! | [`workspace`] | Scan orchestration and cancellation |
//! | [`reconcile`] | Export, process, sync, and triage flows |
//! | [`remote`] | HTTP delivery of annotation batches |
//! | [`progress`] | Scan progress reporting |

pub mod catalog;
pub mod config;
pub mod error;
pub mod files;
pub mod identity;
pub mod index;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod remote;
pub mod scanner;
pub mod state;
pub mod workspace;
