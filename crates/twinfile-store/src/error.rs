use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which of the two slots of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotId {
    /// The slot with file suffix `1`. Wins every tie.
    A,
    /// The slot with file suffix `2`.
    B,
}

impl SlotId {
    /// Numeric file-name suffix of this slot.
    pub fn suffix(self) -> u8 {
        match self {
            Self::A => 1,
            Self::B => 2,
        }
    }

    /// The other slot.
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file{}", self.suffix())
    }
}

/// Kind of access an operation needs from a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Errors from dual-slot store operations.
///
/// None of these are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A specific slot lacks the permission the operation needs.
    #[error("there is no {access}-access for the given path [{}]", .path.display())]
    Access { path: PathBuf, access: Access },

    /// Both files exist and neither grants the needed access.
    #[error("both files are locked for {access}-access")]
    BothLocked { access: Access },

    /// Both files exist and exactly one of them denies the needed access.
    #[error("{slot} is locked for {access}-access")]
    SingleLocked { slot: SlotId, access: Access },

    /// The two copies cannot be ordered by age.
    #[error("could not read the modified time of one of the files")]
    UnknownModifiedTime,

    /// A read was requested but neither file exists.
    #[error("there is no file to read from, both files are missing")]
    NoFile,

    /// I/O error while deleting, writing, or reading a slot.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store configuration is invalid or could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
