//! # Token Launcher Test Suite
//!
//! Cross-crate tests. Per-crate unit tests live next to the code they test.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── router_benchmarks.rs   # Call round trips through the router
//! └── src/integration/
//!     ├── launcher_flows.rs      # deploy → mint → transfer on the simulated network
//!     └── worker_choreography.rs # concurrent callers against one worker
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tl-tests
//! cargo bench -p tl-tests
//! ```

pub mod integration;
