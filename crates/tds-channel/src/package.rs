//! Typed TDS 5.0 packages.
//!
//! Only the packages the query path inspects are modelled in detail; every
//! other token surfaces as [`Package::Other`] carrying its token byte.

use bitflags::bitflags;

use crate::value::Value;

/// Token type bytes of the modelled packages.
pub mod token_type {
    /// Language (TDS_LANGUAGE).
    pub const LANGUAGE: u8 = 0x21;
    /// Row format (TDS_ROWFMT).
    pub const ROW_FORMAT: u8 = 0xEE;
    /// Row (TDS_ROW).
    pub const ROW: u8 = 0xD1;
    /// Done (TDS_DONE).
    pub const DONE: u8 = 0xFD;
    /// Extended error (TDS_EED).
    pub const EED: u8 = 0xE5;
}

/// A package read from or written to a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Package {
    /// Column layout for the rows that follow.
    RowFormat(RowFormat),
    /// One row of field values.
    Row(Row),
    /// End of one stage of execution.
    Done(Done),
    /// Extended error detail from the server.
    Eed(ExtendedError),
    /// Outbound language command.
    Language(Language),
    /// Any other token, identified by its token byte.
    Other(u8),
}

impl Package {
    /// Build a language package for a command string.
    pub fn language(cmd: impl Into<String>) -> Self {
        Self::Language(Language { cmd: cmd.into() })
    }

    /// Token byte of this package.
    #[must_use]
    pub fn token_type(&self) -> u8 {
        match self {
            Self::RowFormat(_) => token_type::ROW_FORMAT,
            Self::Row(_) => token_type::ROW,
            Self::Done(_) => token_type::DONE,
            Self::Eed(_) => token_type::EED,
            Self::Language(_) => token_type::LANGUAGE,
            Self::Other(token) => *token,
        }
    }

    /// Get the done marker, if this is one.
    #[must_use]
    pub fn as_done(&self) -> Option<&Done> {
        match self {
            Self::Done(done) => Some(done),
            _ => None,
        }
    }
}

/// Language command package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// Command text.
    pub cmd: String,
}

/// Column description within a row format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFormat {
    /// Column name.
    pub name: String,
    /// Wire data type byte.
    pub data_type: u8,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnFormat {
    /// Create a nullable column description.
    pub fn new(name: impl Into<String>, data_type: u8) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

/// Row format package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFormat {
    /// Column descriptions in wire order.
    pub columns: Vec<ColumnFormat>,
}

impl RowFormat {
    /// Build a row format from column names, typed as variable-length chars.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|name| ColumnFormat::new(name, 0x27))
                .collect(),
        }
    }

    /// Column names in wire order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Row package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Field values aligned with the active row format.
    pub fields: Vec<Value>,
}

impl Row {
    /// Create a row from field values.
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }
}

bitflags! {
    /// Done status bits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct DoneStatus: u16 {
        /// More results follow.
        const MORE = 0x0001;
        /// The statement failed.
        const ERROR = 0x0002;
        /// A transaction is in progress.
        const INXACT = 0x0004;
        /// Result of a stored procedure.
        const PROC = 0x0008;
        /// The count field is valid.
        const COUNT = 0x0010;
        /// Attention acknowledgment.
        const ATTN = 0x0020;
        /// Event notification.
        const EVENT = 0x0040;
    }
}

/// Three-way reading of a done status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneKind {
    /// More packages follow.
    More,
    /// Final marker of the response.
    Final,
    /// The stage ended in error.
    Error,
}

impl DoneStatus {
    /// Final status (no bits set).
    pub const FINAL: Self = Self::empty();

    /// Classify the status. `ERROR` wins over `MORE`; anything else is final.
    #[must_use]
    pub fn kind(&self) -> DoneKind {
        if self.contains(Self::ERROR) {
            DoneKind::Error
        } else if self.contains(Self::MORE) {
            DoneKind::More
        } else {
            DoneKind::Final
        }
    }
}

/// Transaction state carried by a done marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranState {
    /// Not inside a transaction.
    #[default]
    NotInTran,
    /// Transaction still running.
    InProgress,
    /// Transaction completed.
    Completed,
    /// Transaction failed.
    Failed,
    /// Statement within the transaction failed.
    StmtFailed,
    /// Unrecognized state value.
    Unknown(u16),
}

impl TranState {
    /// Decode from the wire value.
    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::NotInTran,
            1 => Self::InProgress,
            2 => Self::Completed,
            3 => Self::Failed,
            4 => Self::StmtFailed,
            other => Self::Unknown(other),
        }
    }

    /// Encode to the wire value.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::NotInTran => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::Failed => 3,
            Self::StmtFailed => 4,
            Self::Unknown(other) => other,
        }
    }
}

/// Done package marking the end of one stage of execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Done {
    /// Status flags.
    pub status: DoneStatus,
    /// Transaction state.
    pub tran_state: TranState,
    /// Affected row count.
    pub count: u32,
}

impl Done {
    /// Create a done marker.
    #[must_use]
    pub fn new(status: DoneStatus, tran_state: TranState, count: u32) -> Self {
        Self {
            status,
            tran_state,
            count,
        }
    }

    /// Final marker of a completed transaction.
    #[must_use]
    pub fn completed(count: u32) -> Self {
        Self::new(DoneStatus::COUNT, TranState::Completed, count)
    }

    /// Intermediate marker with more packages to follow.
    #[must_use]
    pub fn more(count: u32) -> Self {
        Self::new(
            DoneStatus::MORE | DoneStatus::COUNT,
            TranState::InProgress,
            count,
        )
    }

    /// Classified status.
    #[must_use]
    pub fn kind(&self) -> DoneKind {
        self.status.kind()
    }

    /// Check if the server considers the transaction finished.
    #[must_use]
    pub fn is_tran_completed(&self) -> bool {
        self.tran_state == TranState::Completed
    }
}

/// Extended error detail (one server message).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedError {
    /// Message number.
    pub number: i32,
    /// Error state.
    pub state: u8,
    /// Severity class.
    pub class: u8,
    /// Message text.
    pub message: String,
    /// Server name.
    pub server: String,
    /// Procedure name, if any.
    pub procedure: String,
    /// Line number in the batch.
    pub line: u16,
}

impl ExtendedError {
    /// Create an error detail with a number and message.
    pub fn new(number: i32, message: impl Into<String>) -> Self {
        Self {
            number,
            message: message.into(),
            ..Self::default()
        }
    }
}
