//! Command handlers
//!
//! The operations a front end calls. Each returns an [`ErrorResponse`]
//! carrying a stable error code on failure.
//!
//! [`ErrorResponse`]: crate::utils::ErrorResponse

pub mod chorus;
pub mod export;
pub mod recording;
pub mod takes;

pub use chorus::ChorusState;
pub use export::ExportState;
pub use recording::RecorderState;
pub use takes::AppState;
