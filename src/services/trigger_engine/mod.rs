//! TriggerEngine service: responsibility and boundaries
//!
//! This module owns the trigger state and decides when accumulated
//! inactivity runs the locker, the notifier or the killer. It MUST NOT watch
//! windows or read messages; it only consumes the signals those services send.

mod scheduler;
mod r#trait;

pub use self::r#trait::TriggerEngine;
pub use self::scheduler::{Scheduler, TriggerAction, TriggerState};
