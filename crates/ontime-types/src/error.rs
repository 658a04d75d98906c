//! Error types for the OnTime commitment escrow.
//!
//! All errors use the `OT_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by failure class:
//! - 1xx: Authorization errors (caller or signer not on the roster)
//! - 2xx: State errors (operation invalid for the current lifecycle state)
//! - 3xx: Validation errors (malformed input)
//! - 4xx: Crypto errors (signature does not recover to an authorized identity)
//! - 5xx: Transfer errors (fund release failed)
//! - 8xx: Invariant violations
//! - 9xx: Configuration / internal errors
//!
//! Every class except transfer failures is raised before any mutation.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, CommitmentState};

/// Coarse classification of an [`OntimeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    State,
    Validation,
    Crypto,
    Transfer,
    Invariant,
    Configuration,
}

/// Central error enum for all OnTime operations.
#[derive(Debug, Error)]
pub enum OntimeError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The caller is not a member of the roster.
    #[error("OT_ERR_100: {0} is not on the roster")]
    NotOnRoster(Address),

    /// A named witness is not a member of the roster.
    #[error("OT_ERR_101: Witness {0} is not on the roster")]
    WitnessNotOnRoster(Address),

    /// The caller never deposited and may not take part in this operation.
    #[error("OT_ERR_102: {0} has not deposited")]
    NotDepositor(Address),

    // =================================================================
    // State Errors (2xx)
    // =================================================================
    /// An operation was attempted in the wrong lifecycle state.
    #[error("OT_ERR_200: Wrong state: expected {expected}, got {actual}")]
    WrongState {
        expected: CommitmentState,
        actual: CommitmentState,
    },

    /// The commitment is already finalized.
    #[error("OT_ERR_201: Commitment already finalized")]
    AlreadyFinalized,

    /// The participant already deposited.
    #[error("OT_ERR_202: {0} already deposited")]
    AlreadyDeposited(Address),

    /// The voter already cast a vote.
    #[error("OT_ERR_203: {0} already voted")]
    AlreadyVoted(Address),

    /// A vote arrived outside the reporting window.
    #[error("OT_ERR_204: Vote at {now} outside reporting window [{opens}, {closes}]")]
    OutsideReportingWindow { now: u64, opens: u64, closes: u64 },

    /// Finalization attempted before its guard is satisfied.
    #[error("OT_ERR_205: Too early to finalize (now {now}, opens after {opens_after})")]
    FinalizeTooEarly { now: u64, opens_after: u64 },

    /// Cancellation attempted after arrivals or votes were recorded.
    #[error("OT_ERR_206: Cannot cancel: {reason}")]
    CancelNotAllowed { reason: String },

    /// Withdrawal attempted with nothing to withdraw.
    #[error("OT_ERR_207: Nothing to withdraw for {0}")]
    NothingToWithdraw(Address),

    // =================================================================
    // Validation Errors (3xx)
    // =================================================================
    /// The deposit amount does not equal the required amount.
    #[error("OT_ERR_300: Wrong deposit amount: required {required}, got {provided}")]
    WrongDepositAmount { required: Decimal, provided: Decimal },

    /// The proof reference was empty.
    #[error("OT_ERR_301: Proof reference must not be empty")]
    EmptyProofReference,

    /// A signature was not exactly 65 bytes.
    #[error("OT_ERR_302: Invalid signature length: expected 65, got {0}")]
    InvalidSignatureLength(usize),

    /// The attested timestamp is before the meeting time.
    #[error("OT_ERR_303: Timestamp {timestamp} is before meeting time {meeting_time}")]
    TimestampBeforeMeeting { timestamp: u64, meeting_time: u64 },

    /// The attested timestamp is later than the shared clock.
    #[error("OT_ERR_304: Timestamp {timestamp} is in the future (now {now})")]
    TimestampInFuture { timestamp: u64, now: u64 },

    /// Witness / counterparty set is malformed (duplicates, self-witnessing).
    #[error("OT_ERR_305: Invalid witnesses: {reason}")]
    InvalidWitnesses { reason: String },

    /// The roster is malformed.
    #[error("OT_ERR_306: Invalid roster: {reason}")]
    InvalidRoster { reason: String },

    /// The address bytes or text are malformed.
    #[error("OT_ERR_307: Invalid address: {reason}")]
    InvalidAddress { reason: String },

    /// The vote names a candidate outside the roster.
    #[error("OT_ERR_308: Candidate {0} is not on the roster")]
    CandidateNotOnRoster(Address),

    // =================================================================
    // Crypto Errors (4xx)
    // =================================================================
    /// The supplied signatures do not recover to the expected signers.
    #[error("OT_ERR_400: Signatures do not match expected signers: {reason}")]
    SignerMismatch { reason: String },

    // =================================================================
    // Transfer Errors (5xx)
    // =================================================================
    /// The external fund release failed after the balance was zeroed.
    #[error("OT_ERR_500: Transfer of {amount} to {to} failed: {reason}")]
    TransferFailed {
        to: Address,
        amount: Decimal,
        reason: String,
    },

    // =================================================================
    // Invariant Violations (8xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical safety alert.
    #[error("OT_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Arithmetic left the representable range.
    #[error("OT_ERR_801: Arithmetic overflow in {context}")]
    Overflow { context: &'static str },

    // =================================================================
    // Configuration / Internal (9xx)
    // =================================================================
    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("OT_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("OT_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

impl OntimeError {
    /// Classify this error into the coarse taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOnRoster(_) | Self::WitnessNotOnRoster(_) | Self::NotDepositor(_) => {
                ErrorKind::Authorization
            }
            Self::WrongState { .. }
            | Self::AlreadyFinalized
            | Self::AlreadyDeposited(_)
            | Self::AlreadyVoted(_)
            | Self::OutsideReportingWindow { .. }
            | Self::FinalizeTooEarly { .. }
            | Self::CancelNotAllowed { .. }
            | Self::NothingToWithdraw(_) => ErrorKind::State,
            Self::WrongDepositAmount { .. }
            | Self::EmptyProofReference
            | Self::InvalidSignatureLength(_)
            | Self::TimestampBeforeMeeting { .. }
            | Self::TimestampInFuture { .. }
            | Self::InvalidWitnesses { .. }
            | Self::InvalidRoster { .. }
            | Self::InvalidAddress { .. }
            | Self::CandidateNotOnRoster(_) => ErrorKind::Validation,
            Self::SignerMismatch { .. } => ErrorKind::Crypto,
            Self::TransferFailed { .. } => ErrorKind::Transfer,
            Self::SupplyInvariantViolation { .. } | Self::Overflow { .. } => ErrorKind::Invariant,
            Self::Configuration(_) | Self::Serialization(_) => ErrorKind::Configuration,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OntimeError>;

impl From<serde_json::Error> for OntimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
