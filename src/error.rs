// src/error.rs
// Domain error kinds shared across Store, IdentityModel, MembershipModel,
// Messaging, and Reconciler. Grounded on examples/ConaryLabs-Mira's
// backend/src/git/error.rs.

use thiserror::Error;

/// Domain error surfaced by the core (spec §7).
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("message not found: {0}")]
    MessageNotFound(i64),

    #[error("agent is not a member of this channel")]
    NotAMember,
    #[error("agent is not allowed to leave this channel")]
    NotAllowedToLeave,
    #[error("agent is not allowed to invite into this channel")]
    NotAllowedToInvite,
    #[error("channel is archived")]
    Archived,
    #[error("direct message forbidden by recipient's dm_policy")]
    DMForbidden,
    #[error("message exceeds maximum length")]
    MessageTooLong,
    #[error("thread_id does not reference an existing message")]
    InvalidThread,

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("store busy: writer lock unavailable within busy timeout")]
    StoreBusy,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Broad error-kind classification used for HTTP status mapping (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    Conflict,
    Invalid,
    StoreBusy,
    Internal,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::ChannelNotFound(_)
            | DomainError::AgentNotFound(_)
            | DomainError::MessageNotFound(_) => ErrorKind::NotFound,

            DomainError::NotAMember
            | DomainError::NotAllowedToLeave
            | DomainError::NotAllowedToInvite
            | DomainError::Archived
            | DomainError::DMForbidden
            | DomainError::MessageTooLong
            | DomainError::InvalidThread => ErrorKind::PreconditionFailed,

            DomainError::Duplicate(_) => ErrorKind::Conflict,
            DomainError::Invalid(_) => ErrorKind::Invalid,
            DomainError::StoreBusy => ErrorKind::StoreBusy,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Convert a raw sqlx error into a domain error at a model boundary.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DomainError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut => DomainError::StoreBusy,
            sqlx::Error::Database(db_err) if is_sqlite_busy(db_err.as_ref()) => {
                DomainError::StoreBusy
            }
            _ => DomainError::Internal(anyhow::Error::new(err)),
        }
    }
}

fn is_sqlite_busy(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err
        .code()
        .map(|code| code == "5" || code == "6") // SQLITE_BUSY / SQLITE_LOCKED
        .unwrap_or(false)
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::from_sqlx(err)
    }
}
