pub mod camera;
pub mod flow;
pub mod ids;
pub mod image;
pub mod messages;
pub mod notifier;
pub mod storage;
pub mod store;

pub use flow::{Kiosk, KioskServices, Snapshot, Step, SubmitOutcome, SUBMIT_FAILED_ALERT};
