//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, CHARM_D};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_compose() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.compose_traits(&[(CHARM_D, 6)], Some(60)).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use client::{traits_body, TestClient};
pub use constants::*;
pub use fixtures::{AudioBehavior, LlmBehavior};
pub use server::{TestServer, TestServerOptions};
