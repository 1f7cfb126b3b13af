//! `sitegate` - Construction-site workforce records with RAMS signing and
//! compliance gating
//!
//! This library keeps the records of one construction site in a local `SQLite`
//! database: users, projects and plots, work assignments, RAMS documents with
//! their signing register, deliveries, site notices, notifications and
//! qualifications. Contractors read a RAMS document for at least its minimum
//! time before they can confirm and sign it, and an activity stays blocked
//! while any RAMS gating it remains unsigned.
//!
//! [`Site`] is the entry point; every operation that changes something takes
//! the acting [`Session`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod compliance;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod logging;
pub mod rams;
pub mod records;
pub mod scoring;
pub mod session;
pub mod site;
pub mod storage;

pub use compliance::{ComplianceStatus, InactiveEntryPolicy};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{ChangeEvent, ChangeKind, EventBus, EventHandler, LogEvents, Table};
pub use filter::ListFilter;
pub use logging::init_logging;
pub use rams::{
    RamsDocument, ReadingGate, ReadingState, RegisterEntry, RegisterStatus, Signature,
};
pub use session::{Permission, Role, Session};
pub use site::{QualificationView, Reading, Site};
pub use storage::{Storage, StorageStats};
