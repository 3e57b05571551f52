//! Résumé tailoring: match scoring, validated replacements and
//! format-preserving PDF edits, orchestrated per (user, job).

pub mod config;
pub mod db;
pub mod document;
pub mod errors;
pub mod llm_client;
pub mod matching;
pub mod models;
pub mod optimizer;
pub mod suggestions;
