pub mod display;
pub mod message_bus;
pub mod subscription_queue;
pub mod tree_watcher;
pub mod trigger_engine;

pub use display::{create_display_client, DisplayClient};
pub use message_bus::{BusAction, InstanceMessageBus, StartupOutcome};
pub use tree_watcher::WindowTreeWatcher;
pub use trigger_engine::{Scheduler, TriggerEngine};
