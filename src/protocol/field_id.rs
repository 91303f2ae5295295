//! Identifiers for the parameters carried in frame bodies.

/// Key of a single parameter inside a frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// Account name presented during authentication.
    Username,
    /// Account password presented during authentication.
    Password,
    /// Server-issued session identifier.
    SessionId,
    /// Query text to execute.
    Statement,
    /// Application-level result code (0 = success).
    ErrorCode,
    /// Human-readable description accompanying a failure code.
    ErrorMsg,
    /// Server-side execution latency in microseconds.
    LatencyUs,
    /// Graph space the statement ran against.
    SpaceName,
    /// One column name of a result set; repeats in column order.
    ColumnName,
    /// One encoded row of a result set; repeats in row order.
    Row,
    /// Any other field id not explicitly covered.
    Other(u16),
}

impl FieldId {
    /// Whether the field may legitimately appear more than once in a body.
    #[must_use]
    pub const fn repeatable(self) -> bool { matches!(self, Self::ColumnName | Self::Row) }
}

impl From<u16> for FieldId {
    fn from(v: u16) -> Self {
        match v {
            1 => Self::Username,
            2 => Self::Password,
            3 => Self::SessionId,
            4 => Self::Statement,
            5 => Self::ErrorCode,
            6 => Self::ErrorMsg,
            7 => Self::LatencyUs,
            8 => Self::SpaceName,
            9 => Self::ColumnName,
            10 => Self::Row,
            other => Self::Other(other),
        }
    }
}

impl From<FieldId> for u16 {
    fn from(f: FieldId) -> Self {
        match f {
            FieldId::Username => 1,
            FieldId::Password => 2,
            FieldId::SessionId => 3,
            FieldId::Statement => 4,
            FieldId::ErrorCode => 5,
            FieldId::ErrorMsg => 6,
            FieldId::LatencyUs => 7,
            FieldId::SpaceName => 8,
            FieldId::ColumnName => 9,
            FieldId::Row => 10,
            FieldId::Other(v) => v,
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username => f.write_str("Username"),
            Self::Password => f.write_str("Password"),
            Self::SessionId => f.write_str("SessionId"),
            Self::Statement => f.write_str("Statement"),
            Self::ErrorCode => f.write_str("ErrorCode"),
            Self::ErrorMsg => f.write_str("ErrorMsg"),
            Self::LatencyUs => f.write_str("LatencyUs"),
            Self::SpaceName => f.write_str("SpaceName"),
            Self::ColumnName => f.write_str("ColumnName"),
            Self::Row => f.write_str("Row"),
            Self::Other(v) => write!(f, "Other({v})"),
        }
    }
}
