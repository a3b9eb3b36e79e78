//! Integration tests for liftsync-storage
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies the
//! backup repository's folder handling, uploads, listings and error
//! mapping.

mod common;

mod test_drive;
