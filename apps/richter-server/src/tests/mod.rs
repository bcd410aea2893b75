//! Server unit and integration tests.
//!
//! Tests are organized into modules by feature area:
//! - `common` - Shared test state, recording fakes and request helpers
//! - `token` - Session token issue/verify tests
//! - `access` - Authentication and admin middleware tests
//! - `verification` - Registration and code redemption workflow tests
//! - `health` - Liveness and readiness probe tests
//! - `handlers` - HTTP handler tests driven through the router

pub mod common;
