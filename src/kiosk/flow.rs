use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crate::error::{CaptureError, StorageError, SubmitError};
use crate::models::{NewSubmission, Submission};

use super::camera::{Camera, StreamGuard};
use super::ids::IdGenerator;
use super::image::{self, CapturedImage, DEFAULT_CONTENT_TYPE};
use super::messages;
use super::notifier::Notifier;
use super::storage::{self, ObjectStorage, UploadOptions};
use super::store::SubmissionStore;

/// Alert shown for any failed submit, whatever the cause.
pub const SUBMIT_FAILED_ALERT: &str = "Failed to submit photo. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Capture,
    Preview,
    ThankYou,
}

pub struct KioskServices {
    pub camera: Arc<dyn Camera>,
    pub storage: Arc<dyn ObjectStorage>,
    pub store: Arc<dyn SubmissionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub ids: Arc<IdGenerator>,
}

/// What a front end needs to render the current screen.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub step: Step,
    pub image: Option<CapturedImage>,
    pub message: Option<String>,
    pub submitting: bool,
    pub alert: Option<String>,
    pub camera_live: bool,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub user_id: String,
    pub message: String,
    pub submission: Option<Submission>,
}

struct KioskState {
    step: Step,
    image: Option<CapturedImage>,
    message: Option<String>,
    submitting: bool,
    alert: Option<String>,
    stream: Option<StreamGuard>,
    /// Bumped on every entry into thank-you so stale resets are ignored.
    generation: u64,
}

struct Inner {
    services: KioskServices,
    reset_delay: Duration,
    state: Mutex<KioskState>,
}

/// Capture → preview → thank-you flow for one kiosk screen.
///
/// Cheap to clone; all clones drive the same screen. The camera stream is released
/// when the flow leaves the capture step and when the last clone is dropped.
#[derive(Clone)]
pub struct Kiosk {
    inner: Arc<Inner>,
}

impl Kiosk {
    pub fn new(services: KioskServices, reset_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                services,
                reset_delay,
                state: Mutex::new(KioskState {
                    step: Step::Capture,
                    image: None,
                    message: None,
                    submitting: false,
                    alert: None,
                    stream: None,
                    generation: 0,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, KioskState> {
        lock(&self.inner)
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state();
        Snapshot {
            step: state.step,
            image: state.image.clone(),
            message: state.message.clone(),
            submitting: state.submitting,
            alert: state.alert.clone(),
            camera_live: state.stream.is_some(),
        }
    }

    /// Open the camera for the capture step. Returns whether a live stream is available.
    ///
    /// Device failures are logged and leave the kiosk in capture without a stream.
    pub async fn start_camera(&self) -> bool {
        {
            let state = self.state();
            if state.step != Step::Capture {
                return false;
            }
            if state.stream.is_some() {
                return true;
            }
        }

        let stream = match self.inner.services.camera.open().await {
            Ok(stream) => StreamGuard::new(stream),
            Err(e) => {
                tracing::error!("Error accessing camera: {e}");
                return false;
            }
        };

        let mut state = self.state();
        if state.step == Step::Capture && state.stream.is_none() {
            state.stream = Some(stream);
            true
        } else {
            // Flow moved on (or another open won) while the device was opening.
            state.stream.is_some() && state.step == Step::Capture
        }
    }

    /// Grab a frame from the live stream and move to preview.
    ///
    /// Without a live stream this fails with `NoStream`; the caller should offer a file instead.
    pub async fn capture_photo(&self) -> Result<(), CaptureError> {
        let mut stream = {
            let mut state = self.state();
            if state.step != Step::Capture {
                return Err(CaptureError::WrongStep);
            }
            state.stream.take().ok_or(CaptureError::NoStream)?
        };

        let frame = match stream.capture_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                let mut state = self.state();
                if state.step == Step::Capture && state.stream.is_none() {
                    state.stream = Some(stream);
                }
                return Err(e);
            }
        };
        drop(stream);

        self.hold(CapturedImage::from_bytes(&frame, DEFAULT_CONTENT_TYPE))
    }

    /// The file-picker path: read an image from disk and move to preview.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<(), CaptureError> {
        let path = path.as_ref();
        let step = self.state().step;
        if step != Step::Capture {
            return Err(CaptureError::WrongStep);
        }

        let bytes = tokio::fs::read(path).await?;
        let content_type = image::content_type_for_path(path);

        self.hold(CapturedImage::from_bytes(&bytes, content_type))
    }

    fn hold(&self, image: CapturedImage) -> Result<(), CaptureError> {
        let released = {
            let mut state = self.state();
            if state.step != Step::Capture {
                return Err(CaptureError::WrongStep);
            }
            state.image = Some(image);
            state.alert = None;
            state.step = Step::Preview;
            state.stream.take()
        };
        drop(released);
        Ok(())
    }

    /// Discard the held image and go back to capture.
    pub async fn retake(&self) -> Result<(), CaptureError> {
        {
            let mut state = self.state();
            if state.step != Step::Preview || state.submitting {
                return Err(CaptureError::WrongStep);
            }
            state.image = None;
            state.alert = None;
            state.step = Step::Capture;
        }

        self.start_camera().await;
        Ok(())
    }

    /// Upload the held image, record it, and notify the hub.
    ///
    /// On failure the kiosk stays in preview with the same image and a generic alert.
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let image = {
            let mut state = self.state();
            if state.submitting {
                return Err(SubmitError::Busy);
            }
            let image = match (&state.step, &state.image) {
                (Step::Preview, Some(image)) => image.clone(),
                _ => return Err(SubmitError::NoImage),
            };
            state.submitting = true;
            state.alert = None;
            image
        };
        let mut busy = BusyGuard {
            inner: &self.inner,
            armed: true,
        };

        let result = self.run_submission(&image).await;

        let generation = {
            let mut state = self.state();
            state.submitting = false;
            busy.armed = false;
            match &result {
                Ok(outcome) => {
                    state.message = Some(outcome.message.clone());
                    state.step = Step::ThankYou;
                    state.generation += 1;
                    Some(state.generation)
                }
                Err(e) => {
                    tracing::error!("Error submitting photo: {e}");
                    state.alert = Some(SUBMIT_FAILED_ALERT.to_string());
                    None
                }
            }
        };

        if let Some(generation) = generation {
            self.schedule_reset(generation);
        }

        result
    }

    async fn run_submission(&self, image: &CapturedImage) -> Result<SubmitOutcome, SubmitError> {
        let services = &self.inner.services;

        let blob = image.decode()?;
        let content_type = if blob.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            blob.content_type.as_str()
        };

        let path = storage::object_path(&blob.content_type);
        let options = UploadOptions::new(content_type);

        let uploaded = services
            .storage
            .upload(&path, blob.bytes.clone(), &options)
            .await?;
        if uploaded.path.is_empty() {
            return Err(StorageError::EmptyPath.into());
        }

        let image_url = services
            .storage
            .public_url(&uploaded.path)
            .ok_or_else(|| SubmitError::MissingPublicUrl(uploaded.path.clone()))?;

        let message = messages::random().to_string();
        let user_id = services.ids.generate();

        let row = services
            .store
            .insert(&NewSubmission {
                user_id: user_id.clone(),
                user_message: message.clone(),
                image_url,
            })
            .await?;

        if row.is_some() {
            if let Err(e) = services.notifier.notify(&user_id).await {
                tracing::warn!("Failed to notify hub for user {user_id}: {e}");
            }
        }

        tracing::info!("Submitted selfie for user {user_id}");

        Ok(SubmitOutcome {
            user_id,
            message,
            submission: row,
        })
    }

    fn schedule_reset(&self, generation: u64) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.reset_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let kiosk = Kiosk { inner };

            if kiosk.reset_if_current(generation) {
                kiosk.start_camera().await;
            }
        });
    }

    fn reset_if_current(&self, generation: u64) -> bool {
        let mut state = self.state();
        if state.step != Step::ThankYou || state.generation != generation {
            return false;
        }
        state.step = Step::Capture;
        state.image = None;
        state.message = None;
        state.alert = None;
        true
    }
}

/// Clears the busy flag if a submit ends without applying its result,
/// e.g. when the future is dropped mid-flight.
struct BusyGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.inner).submitting = false;
        }
    }
}

fn lock(inner: &Inner) -> MutexGuard<'_, KioskState> {
    inner.state.lock().unwrap_or_else(PoisonError::into_inner)
}
