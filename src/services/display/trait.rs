use crate::error::Result;
use crate::events::{DisplayEvent, EventInterest, KeyPressClaims, TreeInfo, WindowId};

/// Идентификатор атома X-сервера
pub type Atom = u32;

/// Primitives of the windowing client used by the watcher and the message bus.
///
/// Queries about a window that no longer exists return `Ok(None)`; that is a
/// normal race with the clients owning the tree, not a failure. `Err` is
/// reserved for a broken connection.
pub trait DisplayClient {
    /// Root windows of every screen
    fn roots(&self) -> Vec<WindowId>;

    /// Root window of the first screen, which carries the shared properties
    fn default_root(&self) -> WindowId;

    fn query_tree(&self, window: WindowId) -> Result<Option<TreeInfo>>;

    fn key_press_claims(&self, window: WindowId) -> Result<Option<KeyPressClaims>>;

    fn select_input(&self, window: WindowId, interest: EventInterest) -> Result<()>;

    /// Never blocks: `Ok(None)` when nothing is queued
    fn poll_event(&self) -> Result<Option<DisplayEvent>>;

    fn intern_atom(&self, name: &str) -> Result<Atom>;

    /// `None` when the property is absent or is not an integer
    fn get_integer_property(&self, window: WindowId, property: Atom) -> Result<Option<i32>>;

    fn set_integer_property(&self, window: WindowId, property: Atom, value: i32) -> Result<()>;

    fn delete_property(&self, window: WindowId, property: Atom) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// Factory for the real X11 client; `display_name` of `None` uses `$DISPLAY`
pub fn create_display_client(display_name: Option<&str>) -> Result<Box<dyn DisplayClient>> {
    Ok(Box::new(super::x11::X11Display::connect(display_name)?))
}
