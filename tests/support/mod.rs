//! Shared helpers for integration tests.
//!
//! Logging is quiet by default. Set `TEST_LOG` (or `RUST_LOG`) to see the
//! session's tracing output, e.g. `TEST_LOG=ers_state=debug`.

#![allow(dead_code)]

use ers_state::{PlayerId, Session, SessionConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a test subscriber. Safe to call from every test.
pub fn init_logging() {
    let filter = std::env::var("TEST_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init()
        .ok();
}

/// Property test config; `PROPTEST_CASES` overrides the case count.
pub fn proptest_config() -> proptest::prelude::ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(48)
        .max(1);

    proptest::prelude::ProptestConfig {
        cases,
        ..proptest::prelude::ProptestConfig::default()
    }
}

/// A seeded session with `players` seated and the cards dealt.
pub fn started_session(seed: u64, players: usize) -> (Session, Vec<PlayerId>) {
    let mut session = Session::new(SessionConfig::default().with_seed(seed));
    let ids = (0..players)
        .map(|i| session.join(&format!("player-{i}")).unwrap())
        .collect();
    session.start_game().unwrap();
    (session, ids)
}
