//! Protocol status codes and execution-state classification
//!
//! Every response carries a status code. The execution engine does not
//! interpret business semantics; it only needs each code classified into an
//! [`ExecutionState`]. Submission and receipt polling use different tables:
//! a receipt that does not exist yet is a normal transient condition, not
//! an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol response codes, as assigned by the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The request passed precheck validation
    Ok,
    /// Any error without a more specific code
    InvalidTransaction,
    /// The payer account does not exist
    PayerAccountNotFound,
    /// The named node account does not match the receiving node
    InvalidNodeAccount,
    /// The validity window ended before the request reached consensus
    TransactionExpired,
    /// The validity window starts in the future
    InvalidTransactionStart,
    /// The validity duration was non-positive or too long
    InvalidTransactionDuration,
    /// A signature failed verification
    InvalidSignature,
    /// The memo exceeded the permitted length
    MemoTooLong,
    /// The offered fee was insufficient for this request kind
    InsufficientTxFee,
    /// The payer cannot cover the fee
    InsufficientPayerBalance,
    /// A request with this transaction id was already submitted
    DuplicateTransaction,
    /// The node is throttled and cannot accept the request right now
    Busy,
    /// The operation is not supported
    NotSupported,
    /// The file id is invalid or does not exist
    InvalidFileId,
    /// The account id is invalid or does not exist
    InvalidAccountId,
    /// The contract id is invalid or does not exist
    InvalidContractId,
    /// The transaction id is malformed
    InvalidTransactionId,
    /// No receipt exists (yet) for the transaction id
    ReceiptNotFound,
    /// No record exists (yet) for the transaction id
    RecordNotFound,
    /// The outcome is not yet known
    Unknown,
    /// The transaction succeeded at consensus
    Success,
    /// The transaction failed for an invalid reason during consensus
    FailInvalid,
    /// The fee was insufficient at consensus time
    FailFee,
    /// The payer balance was insufficient at consensus time
    FailBalance,
    /// A required key was not provided
    KeyRequired,
    /// A provided key was malformed
    BadEncoding,
    /// The account balance is insufficient for the transfer
    InsufficientAccountBalance,
    /// The node is not currently processing requests
    PlatformNotActive,
    /// The platform failed to create the transaction
    PlatformTransactionNotCreated,
    /// The target account was deleted
    AccountDeleted,
    /// The target file was deleted
    FileDeleted,
    /// A code this client version does not recognize
    Unrecognized(i32),
}

impl Status {
    /// Map a raw protocol code to a status
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Ok,
            1 => Status::InvalidTransaction,
            2 => Status::PayerAccountNotFound,
            3 => Status::InvalidNodeAccount,
            4 => Status::TransactionExpired,
            5 => Status::InvalidTransactionStart,
            6 => Status::InvalidTransactionDuration,
            7 => Status::InvalidSignature,
            8 => Status::MemoTooLong,
            9 => Status::InsufficientTxFee,
            10 => Status::InsufficientPayerBalance,
            11 => Status::DuplicateTransaction,
            12 => Status::Busy,
            13 => Status::NotSupported,
            14 => Status::InvalidFileId,
            15 => Status::InvalidAccountId,
            16 => Status::InvalidContractId,
            17 => Status::InvalidTransactionId,
            18 => Status::ReceiptNotFound,
            19 => Status::RecordNotFound,
            21 => Status::Unknown,
            22 => Status::Success,
            23 => Status::FailInvalid,
            24 => Status::FailFee,
            25 => Status::FailBalance,
            26 => Status::KeyRequired,
            27 => Status::BadEncoding,
            28 => Status::InsufficientAccountBalance,
            67 => Status::PlatformNotActive,
            69 => Status::PlatformTransactionNotCreated,
            72 => Status::AccountDeleted,
            73 => Status::FileDeleted,
            other => Status::Unrecognized(other),
        }
    }

    /// The raw protocol code for this status
    pub fn code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::InvalidTransaction => 1,
            Status::PayerAccountNotFound => 2,
            Status::InvalidNodeAccount => 3,
            Status::TransactionExpired => 4,
            Status::InvalidTransactionStart => 5,
            Status::InvalidTransactionDuration => 6,
            Status::InvalidSignature => 7,
            Status::MemoTooLong => 8,
            Status::InsufficientTxFee => 9,
            Status::InsufficientPayerBalance => 10,
            Status::DuplicateTransaction => 11,
            Status::Busy => 12,
            Status::NotSupported => 13,
            Status::InvalidFileId => 14,
            Status::InvalidAccountId => 15,
            Status::InvalidContractId => 16,
            Status::InvalidTransactionId => 17,
            Status::ReceiptNotFound => 18,
            Status::RecordNotFound => 19,
            Status::Unknown => 21,
            Status::Success => 22,
            Status::FailInvalid => 23,
            Status::FailFee => 24,
            Status::FailBalance => 25,
            Status::KeyRequired => 26,
            Status::BadEncoding => 27,
            Status::InsufficientAccountBalance => 28,
            Status::PlatformNotActive => 67,
            Status::PlatformTransactionNotCreated => 69,
            Status::AccountDeleted => 72,
            Status::FileDeleted => 73,
            Status::Unrecognized(code) => *code,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// How one attempt's outcome drives the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionState {
    /// The attempt produced a usable response
    Success,
    /// Transient condition: back off, then try again
    Retry,
    /// The node itself is impaired: rotate to another node without sleeping
    NodeUnhealthy,
    /// Deterministic rejection: retrying cannot change the outcome
    RequestError,
}

/// Classify a submission precheck status
pub fn classify_submission(status: Status) -> ExecutionState {
    match status {
        Status::Ok => ExecutionState::Success,
        Status::Busy => ExecutionState::Retry,
        Status::PlatformNotActive | Status::PlatformTransactionNotCreated => {
            ExecutionState::NodeUnhealthy
        }
        _ => ExecutionState::RequestError,
    }
}

/// Classify a receipt-poll response.
///
/// The precheck status gates the poll itself; once it is `Ok`, the carried
/// receipt status decides whether a terminal outcome exists. Any terminal
/// receipt status — accepted or rejected — is resolution success; callers
/// inspect the carried status separately.
pub fn classify_receipt(precheck: Status, receipt_status: Option<Status>) -> ExecutionState {
    match precheck {
        Status::Busy | Status::Unknown | Status::ReceiptNotFound | Status::RecordNotFound => {
            return ExecutionState::Retry
        }
        Status::PlatformNotActive | Status::PlatformTransactionNotCreated => {
            return ExecutionState::NodeUnhealthy
        }
        Status::Ok => {}
        _ => return ExecutionState::RequestError,
    }

    match receipt_status {
        None
        | Some(Status::Unknown)
        | Some(Status::Ok)
        | Some(Status::Busy)
        | Some(Status::ReceiptNotFound)
        | Some(Status::RecordNotFound)
        | Some(Status::PlatformNotActive) => ExecutionState::Retry,
        Some(_) => ExecutionState::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for code in [0, 4, 12, 18, 21, 22, 67, 69, 72] {
            assert_eq!(Status::from_code(code).code(), code);
        }
        assert_eq!(Status::from_code(9999), Status::Unrecognized(9999));
    }

    #[test]
    fn submission_classification() {
        assert_eq!(classify_submission(Status::Ok), ExecutionState::Success);
        assert_eq!(classify_submission(Status::Busy), ExecutionState::Retry);
        assert_eq!(
            classify_submission(Status::PlatformNotActive),
            ExecutionState::NodeUnhealthy
        );
        assert_eq!(
            classify_submission(Status::PlatformTransactionNotCreated),
            ExecutionState::NodeUnhealthy
        );
        assert_eq!(
            classify_submission(Status::AccountDeleted),
            ExecutionState::RequestError
        );
        assert_eq!(
            classify_submission(Status::InsufficientPayerBalance),
            ExecutionState::RequestError
        );
    }

    #[test]
    fn receipt_poll_retries_until_terminal() {
        // Receipt not produced yet, in either layer.
        assert_eq!(
            classify_receipt(Status::ReceiptNotFound, None),
            ExecutionState::Retry
        );
        assert_eq!(
            classify_receipt(Status::Ok, Some(Status::Unknown)),
            ExecutionState::Retry
        );
        assert_eq!(
            classify_receipt(Status::Ok, Some(Status::Ok)),
            ExecutionState::Retry
        );
        // A receipt stamped while the node was out of service is transient.
        assert_eq!(
            classify_receipt(Status::Ok, Some(Status::PlatformNotActive)),
            ExecutionState::Retry
        );
        // Terminal statuses resolve, whether accepted or rejected.
        assert_eq!(
            classify_receipt(Status::Ok, Some(Status::Success)),
            ExecutionState::Success
        );
        assert_eq!(
            classify_receipt(Status::Ok, Some(Status::InsufficientAccountBalance)),
            ExecutionState::Success
        );
        // A failing precheck other than the transient set is a request error.
        assert_eq!(
            classify_receipt(Status::InvalidTransactionId, None),
            ExecutionState::RequestError
        );
    }
}
