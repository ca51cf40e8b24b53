// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured frames
//!
//! Heavy work (JPEG decode, crop, rotate, encode, disk I/O) runs on blocking
//! worker threads so the session context keeps servicing preview results and
//! timers while a still is being stored.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Image reader │ ──▶ │  Photo Pipeline   │ ──▶ │  ImageStore  │
//! │   (JPEG)     │     │  - decode         │     │  (JPEG file) │
//! │              │     │  - crop / rotate  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: still decoding, orientation and persistence

pub mod photo;
