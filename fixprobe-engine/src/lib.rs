/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # fixprobe Engine
//!
//! Operator-facing layer of the fixprobe toolkit.
//!
//! This crate provides:
//! - **Application trait**: callbacks a FIX engine invokes around every message
//! - **ProbeApplication**: history recording and substitution at those callbacks
//! - **Probe**: store, history, session, interception and fuzz operations
//! - **Fuzzing**: per-field payload runs with CSV results
//! - **Templates and dispatch**: message templates and the operator action table
//! - **Builder API**: fluent configuration for probe setup

pub mod application;
pub mod builder;
pub mod dispatch;
pub mod fuzz;
pub mod probe;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{Application, NoOpApplication, ProbeApplication};
pub use builder::{ProbeBuilder, ProbeConfig};
pub use dispatch::{Action, Dispatcher, Handler, HandlerFuture};
pub use fuzz::{FuzzEngine, FuzzOptions, FuzzReport};
pub use probe::Probe;
pub use templates::{Template, TemplateFactory};
