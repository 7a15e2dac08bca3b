//! Loopback redirect capture
//!
//! A short-lived HTTP listener on `127.0.0.1` that receives the browser
//! redirect at the end of an interactive sign-in.
//!
//! ```text
//! start(base, attempts) ──► Awaiting ──► Received ──► Closed
//!                               │                       ▲
//!                               └──► TimedOut ──────────┘
//! ```

pub mod pages;
pub mod server;

pub use server::{CaptureStatus, LoopbackCaptureServer};
