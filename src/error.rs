/// Why a single submit attempt failed. None of these are fatal to the kiosk.
#[derive(Debug)]
pub enum SubmitError {
    NoImage,
    Busy,
    InvalidImage(String),
    Storage(StorageError),
    MissingPublicUrl(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::NoImage => write!(f, "No image to submit"),
            SubmitError::Busy => write!(f, "A submission is already in progress"),
            SubmitError::InvalidImage(msg) => write!(f, "Invalid image: {msg}"),
            SubmitError::Storage(err) => write!(f, "Upload failed: {err}"),
            SubmitError::MissingPublicUrl(path) => {
                write!(f, "Failed to obtain a public URL for {path}")
            }
            SubmitError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<StorageError> for SubmitError {
    fn from(err: StorageError) -> Self {
        SubmitError::Storage(err)
    }
}

impl From<sqlx::Error> for SubmitError {
    fn from(err: sqlx::Error) -> Self {
        SubmitError::Database(err)
    }
}

impl From<base64::DecodeError> for SubmitError {
    fn from(err: base64::DecodeError) -> Self {
        SubmitError::InvalidImage(err.to_string())
    }
}

#[derive(Debug)]
pub enum StorageError {
    Request(reqwest::Error),
    Rejected { status: u16, body: String },
    EmptyPath,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Request(err) => write!(f, "storage request failed: {err}"),
            StorageError::Rejected { status, body } => {
                write!(f, "storage rejected upload ({status}): {body}")
            }
            StorageError::EmptyPath => write!(f, "storage returned no object path"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Request(err)
    }
}

#[derive(Debug)]
pub enum NotifyError {
    Connect(String),
    Send(String),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Connect(msg) => write!(f, "hub connection failed: {msg}"),
            NotifyError::Send(msg) => write!(f, "hub send failed: {msg}"),
            NotifyError::Serialize(err) => write!(f, "event serialization failed: {err}"),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        NotifyError::Serialize(err)
    }
}

#[derive(Debug)]
pub enum CaptureError {
    DeviceUnavailable(String),
    NoStream,
    Frame(String),
    File(std::io::Error),
    WrongStep,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::DeviceUnavailable(msg) => write!(f, "camera unavailable: {msg}"),
            CaptureError::NoStream => write!(f, "no live camera stream, choose a file instead"),
            CaptureError::Frame(msg) => write!(f, "failed to grab frame: {msg}"),
            CaptureError::File(err) => write!(f, "failed to read image file: {err}"),
            CaptureError::WrongStep => write!(f, "not available in the current step"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::File(err)
    }
}
