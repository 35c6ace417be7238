use crate::events::{WatchedWindow, WindowId};
use crate::trace_if_enabled;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Окна, ожидающие полной подписки, в порядке создания.
///
/// Записи добавляются только в конец с неубывающим временем создания, поэтому
/// первая же "молодая" запись означает, что все последующие тоже молоды.
/// Множество `young` повторяет содержимое очереди для быстрой проверки
/// принадлежности.
#[derive(Debug, Default)]
pub struct SubscriptionQueue {
    entries: VecDeque<WatchedWindow>,
    young: HashSet<WindowId>,
}

impl SubscriptionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, window: WindowId, now: Instant) {
        self.entries.push_back(WatchedWindow::new(window, now));
        self.young.insert(window);
    }

    /// Окна, всё ещё ожидающие в очереди
    pub fn young(&self) -> &HashSet<WindowId> {
        &self.young
    }

    /// Передать `promote` каждое окно, чей льготный период истёк, с начала
    /// очереди; остановиться на первом неготовом. Вместе с окном `promote`
    /// получает множество окон, оставшихся в очереди. Возвращает число
    /// продвинутых.
    pub fn drain_eligible<E>(
        &mut self,
        now: Instant,
        grace_period: Duration,
        mut promote: impl FnMut(WindowId, &HashSet<WindowId>) -> Result<(), E>,
    ) -> Result<usize, E> {
        let mut promoted = 0;

        while let Some(front) = self.entries.front() {
            if now.saturating_duration_since(front.created_at) < grace_period {
                break;
            }

            if let Some(entry) = self.entries.pop_front() {
                trace_if_enabled!("Льготный период истёк: {}", entry);
                if !self.entries.iter().any(|other| other.window == entry.window) {
                    self.young.remove(&entry.window);
                }
                promote(entry.window, &self.young)?;
                promoted += 1;
            }
        }

        Ok(promoted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
