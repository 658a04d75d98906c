//! # ontime-types
//!
//! Shared types, errors, and configuration for the **OnTime** attendance
//! commitment escrow.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identities**: [`Address`], [`Roster`]
//! - **Lifecycle**: [`CommitmentState`], [`SettlementOutcome`]
//! - **Notifications**: [`CommitmentEvent`]
//! - **Configuration**: [`CommitmentConfig`], [`DomainConfig`]
//! - **Time**: [`Clock`], [`SystemClock`]
//! - **Errors**: [`OntimeError`] with `OT_ERR_` prefix codes, [`ErrorKind`]
//! - **Constants**: protocol strings and defaults

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod roster;
pub mod state;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use roster::*;
pub use state::*;

// Constants are accessed via `ontime_types::constants::FOO`
// (not re-exported to avoid name collisions).
