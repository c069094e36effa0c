//! Metadata Synchronization Error Hierarchy
//!
//! Defines comprehensive error types for the propagation pipeline,
//! categorized by infrastructure layer and pipeline stage.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Node configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Pipeline failures while capturing or propagating changes
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PropagationError {
    /// Change capture failures against the primary instance
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Delivery failures against a replica target
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Consistency window violations
    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Primary poll cycle failure with context
    #[error("Change poll against primary failed: {0}")]
    PollFailed(String),

    /// Primary returned a page the source could not interpret
    #[error("Malformed change page from primary: {0}")]
    MalformedPage(String),

    /// Queue refused new events until deliveries drain
    #[error("Change queue at soft capacity ({depth}/{capacity})")]
    Backpressure { depth: u64, capacity: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Recoverable failure, the event stays in place and is retried
    #[error("Transient delivery failure to {target}: {reason}")]
    Transient { target: String, reason: String },

    /// Replica holds conflicting state for the entity (HTTP 409)
    #[error("Replica {target} reported a conflict for entity {entity_id}")]
    Conflict { target: String, entity_id: String },

    /// Replica refused the request outright (other 4xx)
    #[error("Replica {target} rejected request with status {status}")]
    Rejected { target: String, status: u16 },

    /// Event cannot be expressed as a call against the target
    #[error("Event {sequence} is not deliverable to {target}: {reason}")]
    Undeliverable {
        target: String,
        sequence: u64,
        reason: String,
    },

    /// Retry budget exhausted, the event is dead-lettered
    #[error("Delivery to {target} gave up after {attempts} attempts")]
    RetriesExhausted { target: String, attempts: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ConvergenceError {
    /// One or more (target, partition) pairs missed the consistency window
    #[error("Consistency window exceeded waiting for sequence {sequence} (waited {duration:?}, lagging: {lagging:?})")]
    WindowExceeded {
        sequence: u64,
        duration: Duration,
        lagging: Vec<String>,
    },

    /// Monitor handle outlived the delivery workers
    #[error("Convergence monitor closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Endpoint unavailable (HTTP 503 equivalent)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Peer communication timeout
    #[error("Connection timeout to {target} after {duration:?}")]
    Timeout { target: String, duration: Duration },

    /// Request exceeded its deadline in transit
    #[error("HTTP request timed out")]
    RequestTimeout(#[source] Box<reqwest::Error>),

    /// Persistent connection failures
    #[error("Socket connect failed")]
    ConnectFailed(#[source] Box<reqwest::Error>),

    /// Retry policy exhaustion
    #[error("Retry timeout after {0:?}")]
    RetryTimeoutError(Duration),

    /// Malformed endpoint addresses
    #[error("Invalid URI format: {0}")]
    InvalidURI(String),

    /// HTTP transport layer errors
    #[error(transparent)]
    HttpError(#[from] Box<reqwest::Error>),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("{0}")]
    TaskBackoffFailed(String),

    #[error("{0}")]
    SignalSendFailed(String),

    #[error("{0}")]
    SignalReceiveFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during queue operations
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Custom error with the offending path attached
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for persisted data
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Change log subsystem failures
    #[error("Change log failure: {0}")]
    LogStorage(String),

    /// Checksum or framing violations in persisted records
    #[error("Data corruption detected at {location}")]
    DataCorruption { location: String },

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Error type for value conversion operations
    #[error("Value convert failed")]
    Convert(#[from] ConvertError),
}

/// Error type for value conversion operations
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Invalid input length error
    ///
    /// This occurs when the input byte slice length doesn't match the required 8 bytes.
    #[error("invalid byte length: expected 8 bytes, received {0} bytes")]
    InvalidLength(usize),

    /// Generic conversion failure with detailed message
    ///
    /// Wraps underlying parsing/conversion errors with context information
    #[error("conversion failure: {0}")]
    ConversionFailure(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Network layer
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // Storage layer
    #[error("Storage operation failed")]
    Storage(#[from] StorageError),

    //Serialization
    #[error("Serialization error")]
    Serialization(#[from] SerializationError),

    // Basic node operations
    #[error("Service failed to start: {0}")]
    ServiceStartFailed(String),

    #[error("General server error: {0}")]
    GeneralServer(String),

    #[error("Internal server error")]
    ServerUnavailable,
}

// Serialization is classified separately (wire payloads and persisted records)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether a retry of the failed operation could plausibly succeed.
    ///
    /// Network-level faults and transient delivery failures are retryable;
    /// conflicts, rejections and everything storage-side are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::System(SystemError::Network(_)) => true,
            Error::Propagation(PropagationError::Delivery(DeliveryError::Transient {
                ..
            })) => true,
            _ => false,
        }
    }
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<ConvertError> for Error {
    fn from(e: ConvertError) -> Self {
        Error::System(SystemError::Storage(StorageError::Convert(e)))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

// ===== Pipeline error conversions =====

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Error::Propagation(PropagationError::Capture(e))
    }
}

impl From<DeliveryError> for Error {
    fn from(e: DeliveryError) -> Self {
        Error::Propagation(PropagationError::Delivery(e))
    }
}

impl From<ConvergenceError> for Error {
    fn from(e: ConvergenceError) -> Self {
        Error::Propagation(PropagationError::Convergence(e))
    }
}

// ===== Infrastructure conversions =====

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        SerializationError::Bincode(err).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::Json(err).into()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let network = if err.is_timeout() {
            NetworkError::RequestTimeout(Box::new(err))
        } else if err.is_connect() {
            NetworkError::ConnectFailed(Box::new(err))
        } else {
            NetworkError::HttpError(Box::new(err))
        };
        network.into()
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        NetworkError::TaskFailed(err).into()
    }
}
