//! Sixaxis pad subsystem: kernel input records in, live snapshot out.
//!
//! Two-stage pipeline:
//!
//! 1. [`event`] - fixed-size binary record decoding
//! 2. [`state`] - code classification and field-by-field merge
//! 3. [`sync`] - decode/apply loop and snapshot publication
//!
//! # Architecture
//!
//! ```text
//! /dev/input/eventN ──► Decoder ──► Synchronizer ──► watch::Receiver<ControllerState>
//!                       (records)   (apply + publish)
//! ```
//!
//! The synchronizer runs on its own task; readers sample the snapshot through
//! watch receivers at whatever cadence suits them.

pub mod event;
pub mod state;
pub mod sync;

pub use event::{read_record, EventClass, RawEventRecord, RECORD_SIZE};
pub use state::{AnalogStick, Button, ControllerState, Orientation, StickAxis};
pub use sync::{SyncError, SyncHandle};
