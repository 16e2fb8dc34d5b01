//! Zogakzogak client data layer.
//!
//! The persistence, synchronization, and normalization core behind the
//! guardian and senior views: a per-profile file store standing in for
//! browser storage, write-through repositories for memories and diary
//! entries, LLM-backed emotion scoring and face recognition, and a
//! best-effort synchronizer mirroring the shared collections to the
//! companion API. Screens own rendering and input; everything they persist
//! or fetch goes through [`state::AppState`].

pub mod api_client;
pub mod auth;
pub mod config;
pub mod connection;
pub mod diary;
pub mod emotion;
pub mod errors;
pub mod llm_client;
pub mod memories;
pub mod models;
pub mod recognition;
pub mod safezone;
pub mod state;
pub mod store;
pub mod sync;
pub mod telemetry;
