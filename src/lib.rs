//! # Governance Harness
//!
//! Governance-document ingestion and hybrid retrieval for agent fleets.
//!
//! Governance Harness takes one versioned, heading-structured policy
//! document, splits it into hierarchical chunks, tags each chunk with the
//! roles it affects and the workflow gate it describes, optionally embeds
//! every chunk through a pluggable provider, and answers free-text queries
//! by vector similarity — or deterministic keyword scoring whenever
//! embeddings are unavailable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │ Document │──▶│   Pipeline     │──▶│  SQLite   │
//! │ (v-label)│   │ Chunk+Tag+Emb │   │ chunks+vec│
//! └──────────┘   └───────┬───────┘   └────┬─────┘
//!                        │                │
//!              ┌─────────┴─────┐   ┌──────┴──────┐
//!              │ Ollama/Voyage │   │ Retrieval    │
//!              │ OpenAI (HTTP) │   │ vector|kwd   │
//!              └───────────────┘   └──────┬──────┘
//!                                  ┌──────┴──────┐
//!                              ┌───┴───┐    ┌────┴───┐
//!                              │  CLI  │    │  HTTP  │
//!                              │ (govx)│    │ (axum) │
//!                              └───────┘    └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! govx init                              # create database
//! govx ingest AGENT.md --version 1.4.0   # chunk + tag + embed + store
//! govx search "QA gates" --role QA       # hybrid search
//! govx sections                          # listing with embedding flags
//! govx version                           # current version + coverage
//! govx serve                             # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration + embedding settings resolution |
//! | [`models`] | Core data types |
//! | [`chunker`] | Heading-boundary document splitting |
//! | [`tagger`] | Role and gate-type detection |
//! | [`embedding`] | Embedding provider abstraction (Ollama, Voyage, OpenAI) |
//! | [`store`] | Chunk store trait + SQLite and in-memory backends |
//! | [`ingest`] | Ingestion orchestration |
//! | [`search`] | Hybrid retrieval engine |
//! | [`sections`] | Sections listing command |
//! | [`version`] | Version overview command |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`error`] | Typed error taxonomy |

pub mod chunker;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod search;
pub mod sections;
pub mod server;
pub mod store;
pub mod tagger;
pub mod version;
