//! # API Shared
//!
//! Shared utilities and definitions for RecordGate APIs.
//!
//! Contains:
//! - Wire request/response bodies with OpenAPI schemas (`responses`)
//! - Header-based caller authentication (`auth`)
//! - Shared services like `HealthService`
//!
//! Used by the HTTP binary for common functionality.

pub mod auth;
pub mod health;
pub mod responses;

pub use auth::{authenticate, AuthFailure, RawCallerHeaders};
pub use health::HealthService;
pub use responses::{
    CreateNoteReq, ErrorRes, EstablishSessionReq, EstablishSessionRes, GateDecisionRes,
    GateVerdict, HealthRes, NoteActionRes, NoteActionView, NoteView, ReadNoteRes, SessionView,
};
