//! # repodoc
//!
//! Turns a public source repository into a grounded, schema-validated
//! documentation object plus a rendered README.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │  Source    │──▶│ repodoc-core                  │──▶│  Render  │
//! │ GitHub/dir │   │ chunk → embed → retrieve →    │   │ MD/HTML  │
//! └────────────┘   │ generate (validate + repair)  │   └────┬─────┘
//!                  └──────────────┬───────────────┘        │
//!                                 │ Ollama (HTTP)           ▼
//!                                 ▼                  ┌──────────────┐
//!                          embeddings / LLM          │  CLI / HTTP  │
//!                                                    └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! repodoc generate https://github.com/owner/repo --format markdown
//! repodoc generate --path ./checkout --owner me --repo thing
//! repodoc serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`source`] | GitHub zipball and local directory acquisition |
//! | [`embedding`] | Ollama embedding provider |
//! | [`llm`] | Ollama generation client |
//! | [`render`] | README Markdown and HTML |
//! | [`service`] | End-to-end request runner |
//! | [`server`] | HTTP server |

pub mod config;
pub mod embedding;
pub mod llm;
pub mod render;
pub mod server;
pub mod service;
pub mod source;

pub use repodoc_core as core;
