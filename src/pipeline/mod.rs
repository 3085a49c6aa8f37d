//! Pipeline stages between a converted document and its final exports.
//!
//! Each submodule implements one step, so each is testable on its own and
//! the vision backend can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ (converter) ──▶ encode ──▶ describe ──▶ splice
//! (name→path)  (Document)    (PNG)      (VLM)     (placeholders)
//!                  └────────── postprocess drives ──────────┘
//! ```
//!
//! 1. [`input`]       — derive the output stem; validate the source PDF
//! 2. [`encode`]      — PNG-encode pictures; base64-wrap for the API
//! 3. [`describe`]    — the `ImageDescriber` capability and its VLM backend;
//!    the only stage with network I/O
//! 4. [`splice`]      — forward-only placeholder cursor
//! 5. [`postprocess`] — per-picture extract/save/describe, then splice every
//!    requested format

pub mod describe;
pub mod encode;
pub mod input;
pub mod postprocess;
pub mod splice;
