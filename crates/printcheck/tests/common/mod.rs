//! Shared test utilities for printcheck integration tests.
//!
//! This module provides:
//! - `PdfBuilder` for plain and password-protected fixtures
//! - `FakeDrive`, a scripted browser showing a Drive folder
//! - `MockDrive`, a mocked Drive v3 REST API

#![allow(dead_code)]

pub mod builders;
pub mod drive_mock;
pub mod fake_browser;

use std::sync::Arc;

use secrecy::SecretString;

use printcheck::{AuthSession, Timeouts};

pub use builders::{p_value, PdfBuilder};
pub use drive_mock::MockDrive;
pub use fake_browser::{FakeDrive, FakeFile};

pub const FOLDER_ID: &str = "11DQ3aYC90myC2AKXbPwzjPRn6_4tATmZ";
pub const ACCESS_TOKEN: &str = "ya29.test-token";
pub const PASSWORD: &str = "Owner123";

pub fn session() -> Arc<AuthSession> {
    Arc::new(AuthSession::new(SecretString::from(ACCESS_TOKEN)))
}

/// Timeouts short enough that failing waits end quickly.
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        locate_ms: 300,
        password_probe_ms: 100,
        settle_ms: 0,
        submit_enabled_ms: 300,
        render_ms: 300,
        download_control_ms: 300,
        localized_download_control_ms: 300,
        interstitial_ms: 100,
        new_page_ms: 300,
        network_idle_ms: 300,
        download_ms: 300,
        case_ms: 5_000,
        poll_interval_ms: 5,
    }
}
