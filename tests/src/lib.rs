//! # Wallet Relay Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs      # Fake browser speaking the page protocol over HTTP
//!     ├── end_to_end.rs   # Server + façade scenarios
//!     └── lifecycle.rs    # Ordering, detach and completion over a real channel
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::lifecycle::
//! ```

pub mod integration;
