//! Cross-crate integration tests.

mod launcher_flows;
mod worker_choreography;
