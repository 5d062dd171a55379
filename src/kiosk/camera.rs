use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CaptureError;

#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// A live camera feed holding the device lock until `stop` is called.
#[async_trait]
pub trait MediaStream: Send {
    /// Grab the current frame as JPEG bytes.
    async fn capture_frame(&mut self) -> Result<Bytes, CaptureError>;

    fn stop(&mut self);
}

/// Owns an open stream and stops it when dropped.
pub struct StreamGuard {
    stream: Box<dyn MediaStream>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self { stream }
    }

    pub async fn capture_frame(&mut self) -> Result<Bytes, CaptureError> {
        self.stream.capture_frame().await
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stream.stop();
    }
}

/// Headless kiosks: every open attempt reports the device as missing.
pub struct NoCamera;

#[async_trait]
impl Camera for NoCamera {
    async fn open(&self) -> Result<Box<dyn MediaStream>, CaptureError> {
        Err(CaptureError::DeviceUnavailable(
            "no camera attached".to_string(),
        ))
    }
}
