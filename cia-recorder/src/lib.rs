//! # cia-recorder
//!
//! Demo recorder for the Enterprise CIA dashboard.
//!
//! A named profile describes what to record: the page, the capture interval
//! and length, a [`source::FrameSource`] that writes one image per tick and a
//! [`sink::VideoSink`] that turns the frame sequence into the final artifact.
//! [`session::Recorder`] drives the two and produces a
//! [`session::RecordingReport`].

pub mod config;
pub mod error;
pub mod navigation;
pub mod session;
pub mod sink;
pub mod source;

pub use config::{Profile, RecorderConfig};
pub use error::{RecorderError, Result};
pub use session::{Recorder, RecordingReport, StopReason};
