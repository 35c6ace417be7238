pub mod command;
pub mod window;

pub use command::Command;
pub use window::{DisplayEvent, EventInterest, KeyPressClaims, TreeInfo, WatchedWindow, WindowId};
