//! vi-diag - Diagnostic requests for the vehicle interface firmware
//!
//! Issues OBD-II / UDS requests over CAN, keeps them within the bus's
//! filter and slot budget, matches responses back to the request that
//! caused them and relays the results downstream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DiagnosticsManager                       │
//! │                                                             │
//! │  add_request ──► RequestPool ◄── cancel_recurring_request   │
//! │                  (free / one-shot / recurring)              │
//! │                        │                                    │
//! │        ┌───────────────┼────────────────┐                   │
//! │        ▼               ▼                ▼                   │
//! │  ┌───────────┐  ┌─────────────┐  ┌─────────────┐            │
//! │  │ filters   │  │ scheduler   │  │ matcher     │            │
//! │  │ (accept.) │  │ send_reqs   │  │ receive_can │            │
//! │  └───────────┘  └──────┬──────┘  └──────┬──────┘            │
//! │                        │                │                   │
//! │                 ┌──────┴────────────────┴──┐                │
//! │                 │ RequestHandle (ISO-TP)   │                │
//! │                 └──────────────────────────┘                │
//! │                                          │                  │
//! │                                     ┌────┴────┐             │
//! │                                     │ relay   │──► Pipeline │
//! │                                     └─────────┘             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the caller's thread: add, cancel, schedule and
//! receive must never be interleaved from two execution contexts.

pub mod command;
pub mod config;
pub mod error;
pub mod filters;
pub mod manager;
pub mod matcher;
pub mod pool;
pub mod protocol;
pub mod relay;
pub mod request;
pub mod scheduler;

pub use command::{ControlCommand, DiagnosticRequestCommand};
pub use config::DiagnosticsConfig;
pub use error::{DiagResult, DiagnosticError};
pub use manager::DiagnosticsManager;
pub use pool::{RequestPool, SlotId, SlotList};
pub use protocol::{
    DiagnosticRequest, DiagnosticResponse, FrameSink, NegativeResponseCode, RequestHandle,
    OBD2_FUNCTIONAL_BROADCAST_ID,
};
pub use relay::{
    relay_response, DiagnosticResponseRecord, MessageBuffer, Pipeline, SimpleMessage,
    VehicleMessage,
};
pub use request::{
    ActiveRequest, RequestOptions, ResponseCallback, ResponseDecoder,
    DIAGNOSTIC_RESPONSE_TIMEOUT_HZ, MAX_RECURRING_DIAGNOSTIC_FREQUENCY_HZ,
};

// Re-export for convenience
pub use vi_core::{BusConfig, CanBus, CanBusSet, CanMessage, ManualClock, MockController, MonotonicClock, TimeSource};
