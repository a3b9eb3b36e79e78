//! Integration tests for liftsync-auth
//!
//! Uses wiremock to stand in for the identity provider's token endpoint
//! and the token vault service.

mod common;

mod test_lifecycle;
mod test_refresh;
mod test_vault;
