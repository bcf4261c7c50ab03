//! Write-Ahead Log Positions
//!
//! A log position is reported by the database as `"<hex-segment>/<hex-offset>"`,
//! for example `16/B374D848`. Positions within one store form a total order,
//! segment major.
//!
//! Each position carries the origin it was read from:
//! - `Insert`: captured on the primary right after a write (a wait target)
//! - `Replay`: how far the local replica has applied incoming changes
//! - `NotReplicating`: the store performs no replication at all

use std::fmt;
use std::str::FromStr;

use super::errors::{PositionError, PositionResult};

/// Longest hex field the database emits (32 bits).
const MAX_HEX_DIGITS: usize = 8;

/// Raw `(segment, offset)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lsn {
    /// High-order component
    pub segment: u32,
    /// Low-order component
    pub offset: u32,
}

impl Lsn {
    /// Create a new LSN.
    pub fn new(segment: u32, offset: u32) -> Self {
        Self { segment, offset }
    }

    /// Flat 64-bit form, segment in the high half.
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.segment) << 32) | u64::from(self.offset)
    }

    /// Inverse of [`Lsn::as_u64`].
    pub fn from_u64(value: u64) -> Self {
        Self {
            segment: (value >> 32) as u32,
            offset: value as u32,
        }
    }

    fn parse_field(field: &str, text: &str) -> PositionResult<u32> {
        if field.is_empty()
            || field.len() > MAX_HEX_DIGITS
            || !field.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(PositionError::Malformed(text.to_string()));
        }
        u32::from_str_radix(field, 16).map_err(|_| PositionError::Malformed(text.to_string()))
    }
}

impl FromStr for Lsn {
    type Err = PositionError;

    fn from_str(text: &str) -> PositionResult<Self> {
        let (segment, offset) = text
            .split_once('/')
            .ok_or_else(|| PositionError::Malformed(text.to_string()))?;

        Ok(Self {
            segment: Self::parse_field(segment, text)?,
            offset: Self::parse_field(offset, text)?,
        })
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.segment, self.offset)
    }
}

/// Where a position was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Primary insert position, captured after a write
    Insert,
    /// Local replay position
    Replay,
    /// Store is not replicating
    NotReplicating,
}

impl Origin {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Insert => "insert",
            Origin::Replay => "replay",
            Origin::NotReplicating => "not_replicating",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A position in the primary's write-ahead log, tagged with its origin.
///
/// Immutable once created. `NotReplicating` has no segment or offset and
/// satisfies every wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogPosition {
    /// Insert-origin position (wait target)
    Insert(Lsn),
    /// Replay-origin position (local progress)
    Replay(Lsn),
    /// No replication monitoring on this store
    NotReplicating,
}

impl LogPosition {
    /// Insert-origin position from raw components.
    pub fn insert(segment: u32, offset: u32) -> Self {
        Self::Insert(Lsn::new(segment, offset))
    }

    /// Replay-origin position from raw components.
    pub fn replay(segment: u32, offset: u32) -> Self {
        Self::Replay(Lsn::new(segment, offset))
    }

    /// Parse a position report.
    ///
    /// A null report is only legal for replay positions, where it means the
    /// store is not replicating. Anything else malformed is an error.
    pub fn parse(text: Option<&str>, origin: Origin) -> PositionResult<Self> {
        match (text, origin) {
            (None, Origin::Replay) | (None, Origin::NotReplicating) => Ok(Self::NotReplicating),
            (None, Origin::Insert) => Err(PositionError::Missing("insert")),
            (Some(text), Origin::Insert) => Ok(Self::Insert(text.trim().parse()?)),
            (Some(text), Origin::Replay) => Ok(Self::Replay(text.trim().parse()?)),
            (Some(text), Origin::NotReplicating) => {
                Err(PositionError::UnexpectedText(text.to_string()))
            }
        }
    }

    /// Parse an insert-origin report.
    pub fn parse_insert(text: &str) -> PositionResult<Self> {
        Self::parse(Some(text), Origin::Insert)
    }

    /// Parse a replay-origin report (null means not replicating).
    pub fn parse_replay(text: Option<&str>) -> PositionResult<Self> {
        Self::parse(text, Origin::Replay)
    }

    /// Text form, `None` for `NotReplicating`.
    pub fn serialize(&self) -> Option<String> {
        self.lsn().map(|lsn| lsn.to_string())
    }

    /// Origin tag
    pub fn origin(&self) -> Origin {
        match self {
            Self::Insert(_) => Origin::Insert,
            Self::Replay(_) => Origin::Replay,
            Self::NotReplicating => Origin::NotReplicating,
        }
    }

    /// Raw components, absent for `NotReplicating`.
    pub fn lsn(&self) -> Option<Lsn> {
        match self {
            Self::Insert(lsn) | Self::Replay(lsn) => Some(*lsn),
            Self::NotReplicating => None,
        }
    }

    /// Check whether this (local) position satisfies `target`.
    pub fn satisfies(&self, target: &LogPosition) -> bool {
        satisfied(self, target)
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lsn() {
            Some(lsn) => write!(f, "{}", lsn),
            None => write!(f, "{}", Origin::NotReplicating),
        }
    }
}

/// Decide whether a local replay position has caught up with a target.
///
/// A non-replicating local store satisfies anything. Otherwise the local
/// position must be at least the target. Callers compare a replay-origin
/// `local` against an insert-origin `target`; a target without components
/// has nothing to wait for.
pub fn satisfied(local: &LogPosition, target: &LogPosition) -> bool {
    match (local.lsn(), target.lsn()) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(local), Some(target)) => local >= target,
    }
}
