//! System-wide constants for the OnTime commitment escrow.

/// Protocol name bound into every attestation digest's domain separator.
pub const PROTOCOL_NAME: &str = "OnTimeCommitment";

/// Protocol version bound into every attestation digest's domain separator.
/// Bump whenever the digest layout changes.
pub const PROTOCOL_VERSION: &str = "1";

/// Type string of the typed-data domain.
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Type string of a witnessed single-arrival statement.
pub const ARRIVAL_TYPE: &str =
    "Arrival(address arriver,address witnessA,address witnessB,uint256 timestamp)";

/// Type string of a one-directional mutual arrival statement.
pub const MUTUAL_ARRIVAL_TYPE: &str =
    "MutualArrival(address arriver,address counterparty,uint256 timestamp)";

/// Prefix of the legacy signed-message digest encoding.
pub const LEGACY_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Length of a recoverable signature (`r ‖ s ‖ v`).
pub const SIGNATURE_LEN: usize = 65;

/// Default grace period after the meeting before penalty settlement may run.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 3600;

/// Denominator of the per-minute penalty rate (basis points).
pub const PENALTY_RATE_DENOMINATOR: u64 = 10_000;

/// Denominator of the honesty refund rate.
pub const PERCENT_DENOMINATOR: u64 = 100;

/// Seconds per whole minute of lateness.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Minimum roster size.
pub const MIN_ROSTER_SIZE: usize = 2;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
