//! In-memory display used by the unit tests of the watcher and the message bus.

use crate::error::Result;
use crate::events::{DisplayEvent, EventInterest, KeyPressClaims, TreeInfo, WindowId};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use super::r#trait::{Atom, DisplayClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Integer(i32),
    Text(String),
}

#[derive(Debug, Default)]
struct Node {
    parent: Option<WindowId>,
    children: Vec<WindowId>,
    others_select_keys: bool,
    do_not_propagate_keys: bool,
}

#[derive(Debug, Default)]
struct Inner {
    roots: Vec<WindowId>,
    nodes: HashMap<WindowId, Node>,
    selected: HashMap<WindowId, EventInterest>,
    select_log: Vec<(WindowId, EventInterest)>,
    events: VecDeque<DisplayEvent>,
    atoms: HashMap<String, Atom>,
    properties: HashMap<(WindowId, Atom), PropertyValue>,
    flushes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryDisplay {
    inner: RefCell<Inner>,
}

impl MemoryDisplay {
    pub fn with_roots(roots: &[WindowId]) -> Self {
        let display = Self::default();
        {
            let mut inner = display.inner.borrow_mut();
            inner.roots = roots.to_vec();
            for &root in roots {
                inner.nodes.insert(root, Node::default());
            }
        }
        display
    }

    pub fn add_window(&self, parent: WindowId, window: WindowId) {
        let mut inner = self.inner.borrow_mut();
        inner.nodes.insert(window, Node { parent: Some(parent), ..Node::default() });
        if let Some(node) = inner.nodes.get_mut(&parent) {
            node.children.push(window);
        }
    }

    /// Окно создано клиентом: появляется в дереве и, если родитель
    /// подписан, в очереди событий
    pub fn create_window(&self, parent: WindowId, window: WindowId) {
        self.add_window(parent, window);
        let parent_watched = self.inner.borrow().selected.contains_key(&parent);
        if parent_watched {
            self.push_event(DisplayEvent::Created { window });
        }
    }

    /// Окно уничтожено, но родитель ещё перечисляет его среди детей
    pub fn vanish(&self, window: WindowId) {
        self.inner.borrow_mut().nodes.remove(&window);
    }

    pub fn set_others_select_keys(&self, window: WindowId) {
        if let Some(node) = self.inner.borrow_mut().nodes.get_mut(&window) {
            node.others_select_keys = true;
        }
    }

    pub fn set_do_not_propagate_keys(&self, window: WindowId) {
        if let Some(node) = self.inner.borrow_mut().nodes.get_mut(&window) {
            node.do_not_propagate_keys = true;
        }
    }

    pub fn push_event(&self, event: DisplayEvent) {
        self.inner.borrow_mut().events.push_back(event);
    }

    pub fn interest(&self, window: WindowId) -> Option<EventInterest> {
        self.inner.borrow().selected.get(&window).copied()
    }

    pub fn select_log(&self) -> Vec<(WindowId, EventInterest)> {
        self.inner.borrow().select_log.clone()
    }

    pub fn pending_events(&self) -> usize {
        self.inner.borrow().events.len()
    }

    pub fn property(&self, window: WindowId, name: &str) -> Option<PropertyValue> {
        let inner = self.inner.borrow();
        let atom = inner.atoms.get(name)?;
        inner.properties.get(&(window, *atom)).cloned()
    }

    pub fn put_property(&self, window: WindowId, name: &str, value: PropertyValue) {
        let atom = self.atom_for(name);
        self.inner.borrow_mut().properties.insert((window, atom), value);
    }

    pub fn flushes(&self) -> usize {
        self.inner.borrow().flushes
    }

    fn atom_for(&self, name: &str) -> Atom {
        let mut inner = self.inner.borrow_mut();
        let next = inner.atoms.len() as Atom + 100;
        *inner.atoms.entry(name.to_string()).or_insert(next)
    }
}

impl DisplayClient for MemoryDisplay {
    fn roots(&self) -> Vec<WindowId> {
        self.inner.borrow().roots.clone()
    }

    fn default_root(&self) -> WindowId {
        self.inner.borrow().roots[0]
    }

    fn query_tree(&self, window: WindowId) -> Result<Option<TreeInfo>> {
        Ok(self.inner.borrow().nodes.get(&window).map(|node| TreeInfo {
            parent: node.parent,
            children: node.children.clone(),
        }))
    }

    fn key_press_claims(&self, window: WindowId) -> Result<Option<KeyPressClaims>> {
        let inner = self.inner.borrow();
        Ok(inner.nodes.get(&window).map(|node| {
            let ours = inner
                .selected
                .get(&window)
                .map_or(false, |interest| interest.includes_keys());
            KeyPressClaims {
                selected: node.others_select_keys || ours,
                not_propagated: node.do_not_propagate_keys,
            }
        }))
    }

    fn select_input(&self, window: WindowId, interest: EventInterest) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.select_log.push((window, interest));
        if inner.nodes.contains_key(&window) {
            inner.selected.insert(window, interest);
        }
        Ok(())
    }

    fn poll_event(&self) -> Result<Option<DisplayEvent>> {
        Ok(self.inner.borrow_mut().events.pop_front())
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        Ok(self.atom_for(name))
    }

    fn get_integer_property(&self, window: WindowId, property: Atom) -> Result<Option<i32>> {
        Ok(match self.inner.borrow().properties.get(&(window, property)) {
            Some(PropertyValue::Integer(value)) => Some(*value),
            _ => None,
        })
    }

    fn set_integer_property(&self, window: WindowId, property: Atom, value: i32) -> Result<()> {
        self.inner
            .borrow_mut()
            .properties
            .insert((window, property), PropertyValue::Integer(value));
        Ok(())
    }

    fn delete_property(&self, window: WindowId, property: Atom) -> Result<()> {
        self.inner.borrow_mut().properties.remove(&(window, property));
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.inner.borrow_mut().flushes += 1;
        Ok(())
    }
}
