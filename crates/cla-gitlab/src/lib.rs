//! GitLab adapter for the CLA merge-request gate.
//!
//! [`GitLabPlatform`] refreshes organization OAuth tokens and hands out
//! [`GitLabClient`]s speaking the v4 REST API. Both share one connection
//! pool configured from [`GitLabConfig`].

pub mod client;
pub mod config;
mod http;
pub mod platform;

pub use client::GitLabClient;
pub use config::GitLabConfig;
pub use platform::GitLabPlatform;
