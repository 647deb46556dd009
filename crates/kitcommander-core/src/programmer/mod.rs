//! Programmer traits and abstractions
//!
//! This module defines the trait that programming backends implement to
//! flash and control the target MCU of a kit.

mod traits;

pub use traits::*;
