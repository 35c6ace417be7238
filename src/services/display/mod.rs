//! Display client: responsibility and boundaries
//!
//! This module is responsible ONLY for talking to the X server: tree queries,
//! event masks, the non-blocking event drain and root-window properties.
//! It MUST NOT decide which windows to watch or what a message means; the
//! watcher and the message bus own those decisions.

#[cfg(test)]
pub(crate) mod memory;
mod x11;
mod r#trait;

pub use self::r#trait::{create_display_client, Atom, DisplayClient};
