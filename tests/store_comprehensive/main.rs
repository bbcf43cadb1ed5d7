//! SmartStore Comprehensive Test Suite
//!
//! End-to-end tests through the public `smartstore` API.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: Scenarios** (the "people" walkthrough)
//!   Register, upsert, query, update, remove on a real store file.
//!
//! - **Tier 2: External Ids** (sync-style upserts)
//!   Resolution, conflicts and atomicity of external-id batches.
//!
//! - **Tier 3: Lifecycle** (registry, keys, persistence)
//!   Reopen, wrong keys, identities, removal.
//!
//! - **Tier 4: Stress** (correctness under load)
//!   Randomized mixed workloads from many threads.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test store_comprehensive
//!
//! # With logs
//! SMARTSTORE_TEST_LOG=1 cargo test --test store_comprehensive -- --nocapture
//! ```

mod test_utils;

mod external_id_tests;
mod lifecycle_tests;
mod people_scenario;
mod stress_tests;
