//! Output generation.
//!
//! # Submodules
//!
//! - [`csv`]: sorts a run's records and writes the quoted CSV artifact; also
//!   reads it back for the digest stage
//!
//! # Output Structure
//!
//! ```text
//! news.csv        # one run, replaced wholesale by the next
//! outbox/
//! └── 2025-05-06T14-30-00_ops-example-com.eml   # digest messages
//! ```

pub mod csv;
