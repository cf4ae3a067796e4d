use thiserror::Error;

/// A single row that failed validation at the repository boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("empty driver id")]
    EmptyDriverId,

    #[error("malformed coordinate pair: {0:?}")]
    MalformedCoordinates(String),

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("unknown priority: {0:?}")]
    UnknownPriority(String),

    #[error("unknown severity: {0:?}")]
    UnknownSeverity(String),

    #[error("unreadable row: {0}")]
    Unreadable(String),

    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// Failure of a backing record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid record: {0}")]
    Record(#[from] RecordError),
}

/// Vehicle-count collaborator failures.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("no feed configured for lane {0}")]
    NoFeed(u8),

    #[error("feed unavailable for lane {lane}: {source}")]
    FeedUnavailable {
        lane: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("feed unreadable for lane {lane}: {source}")]
    FeedUnreadable {
        lane: u8,
        #[source]
        source: csv::Error,
    },
}

/// Configuration-level failures. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("signal post registry unusable: {0}")]
    SignalPosts(#[source] StoreError),
}

/// Errors from the dispatch-facing operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("driver {0:?} is not registered")]
    UnknownDriver(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
