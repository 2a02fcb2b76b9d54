//! Audio output
//!
//! Device selection and a CPAL output stream that owns the render side of
//! the engine.

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, LOW_LATENCY_BUFFER_SIZE};
pub use cpal_backend::{open_output, AudioHandle, AudioOutput};
pub use device::{default_output_device, find_device_by_id, list_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
