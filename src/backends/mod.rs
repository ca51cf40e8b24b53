// SPDX-License-Identifier: MPL-2.0

//! Device layer
//!
//! The session core only talks to the traits in [`camera`]. A platform camera
//! stack plugs in by implementing [`camera::CameraService`]; the in-process
//! [`virtual_camera`] implements it for the CLI and the tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               CameraSession                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │ camera (traits,  │  │ virtual_camera  │  │
//! │  │ sizes, session)  │◄─┤ (synthetic)     │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: service traits, size negotiation, background context and session
//! - [`virtual_camera`]: synthetic back/front cameras

pub mod camera;
pub mod virtual_camera;
