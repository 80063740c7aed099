/// The two supported currencies and the fixed conversion between them.
pub mod currency;

/// Account records, transaction thresholds and balance changes.
/// Balance is modified using events, which are created by handling commands
pub mod account;

/// Boundary validation that turns raw request fields into commands.
pub mod command;

/// Users own accounts. Registration only, records never change afterwards.
pub mod user;

/// Per-key mutual exclusion shared by the engine and the user service.
pub mod sync;

/// Persistence contract, plus "in memory" implementation.
pub mod store;

/// Account operations exposed to callers. Serializes concurrent changes to
/// the same account.
pub mod engine;

/// CSV operation scripts in, CSV results out. Used by the binary and by the
/// integration tests.
pub mod bin_utils;
