//! Shared types for the webinstall installer.
//!
//! Both sides of the request/response boundary depend on this crate: the
//! server resolves an [`InstallStep`] from the request path and answers with a
//! [`StepResponse`], the sequencer sends [`StepParams`] and folds each
//! response back into [`Message`]s.

pub mod outcome;
pub mod params;
pub mod step;

pub use outcome::{Level, Message, StepOutcome, StepResponse};
pub use params::StepParams;
pub use step::{InstallState, InstallStep, StepDescriptor, UnknownStep};
