//! Honeypot attempt store
//!
//! Shared persistence for the VPN portal decoy and the intel sync jobs.
//!
//! ```text
//!  honey-server ──append──▶ ┌──────────────┐ ◀──read── intel-sync
//!                           │ SQLite (WAL) │
//!   creds.log (optional) ◀──┤  creds       │
//!                           │  exploits    │
//!                           └──────────────┘
//! ```
//!
//! The server only ever appends; the sync and report jobs only ever read.

pub mod aggregate;
pub mod db;
pub mod error;
pub mod models;
pub mod sink;

pub use aggregate::IndicatorReport;
pub use error::{StoreError, StoreResult};
pub use models::{CredentialAttempt, ExploitAttempt, Indicator};
pub use sink::{parse_login_body, CredentialSink, LoginSubmission, BLANK_PASSWORD, BLANK_USERNAME};
