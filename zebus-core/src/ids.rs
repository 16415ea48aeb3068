//! Stable identity types: `PeerId`, `Endpoint`, `MessageTypeId`, `LogicalTimestamp`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque peer identity. Value type, total equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a raw identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transport-dependent endpoint address (host:port form typical).
///
/// The wire transport itself is out of scope for this crate; this is
/// carried only as an opaque, comparable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    /// Wrap a raw endpoint string.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable string identifier for a message class (e.g. a full type name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageTypeId(String);

impl MessageTypeId {
    /// Wrap a raw type identifier, typically `module::TypeName`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a `MessageTypeId` from a Rust type's fully-qualified name.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }
}

impl fmt::Display for MessageTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageTypeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageTypeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Monotonic, unique-per-peer logical timestamp at ~100ns resolution.
///
/// Two successive calls to [`LogicalTimestampGenerator::next`] never
/// return equal values, matching spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalTimestamp(u64);

impl LogicalTimestamp {
    /// Construct a timestamp from a raw value (used in tests to simulate
    /// out-of-order delivery).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The smallest possible timestamp; never issued by the generator.
    pub const MIN: Self = Self(0);

    /// Raw value, for logging/debugging only.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly-increasing [`LogicalTimestamp`] values.
///
/// Seeded from wall-clock nanoseconds so timestamps are roughly
/// comparable across peer restarts, then advanced by an atomic counter
/// so concurrent callers on the same peer never observe a collision.
pub struct LogicalTimestampGenerator {
    counter: AtomicU64,
}

impl Default for LogicalTimestampGenerator {
    fn default() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1);
        Self {
            counter: AtomicU64::new(seed.max(1)),
        }
    }
}

impl LogicalTimestampGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next strictly-increasing timestamp.
    pub fn next(&self) -> LogicalTimestamp {
        LogicalTimestamp(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
