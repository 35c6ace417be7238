use std::fmt;
use std::time::Instant;

/// Идентификатор окна на X-сервере
pub type WindowId = u32;

/// Окно, ожидающее полной подписки на события
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedWindow {
    pub window: WindowId,
    pub created_at: Instant,
}

impl WatchedWindow {
    pub fn new(window: WindowId, created_at: Instant) -> Self {
        Self { window, created_at }
    }
}

impl fmt::Display for WatchedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:x} ({}ms назад)",
            self.window,
            self.created_at.elapsed().as_millis()
        )
    }
}

/// Форма дерева вокруг окна на момент запроса
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInfo {
    /// `None` у настоящего корневого окна
    pub parent: Option<WindowId>,
    pub children: Vec<WindowId>,
}

impl TreeInfo {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Кто ещё интересуется нажатиями клавиш на окне
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyPressClaims {
    /// Какой-либо клиент уже выбрал KeyPress на этом окне
    pub selected: bool,
    /// KeyPress не распространяется вверх по дереву
    pub not_propagated: bool,
}

impl KeyPressClaims {
    pub fn allows_claim(&self) -> bool {
        self.selected || self.not_propagated
    }
}

/// Набор событий, на которые подписывается наблюдатель
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventInterest {
    /// Только создание/уничтожение дочерних окон
    Substructure,
    /// Дочерние окна и нажатия клавиш
    SubstructureAndKeys,
}

impl EventInterest {
    pub fn includes_keys(self) -> bool {
        self == EventInterest::SubstructureAndKeys
    }
}

/// Событие, полученное от X-сервера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Created { window: WindowId },
    KeyPress { window: WindowId, synthetic: bool },
    Other,
}

impl DisplayEvent {
    /// Настоящее нажатие клавиши, а не подделка через SendEvent
    pub fn is_genuine_key_press(&self) -> bool {
        matches!(self, DisplayEvent::KeyPress { synthetic: false, .. })
    }
}
