//! Client code for presetsync.
//!
//! This crate provides the caching HTTP fetch wrapper and the GitHub
//! preset importer built on it, shared by the server and any other caller.

pub mod fetch;
pub mod github;

pub use fetch::{CachedResponse, CachingFetcher, FetchConfig, FetchOptions};
pub use github::{GithubClient, GithubConfig, ImportResult, Preset, PresetParam, RepoRef, SkippedFile};
