use crate::error::Result;
use crate::events::{DisplayEvent, EventInterest, WindowId};
use crate::services::display::DisplayClient;
use crate::services::subscription_queue::SubscriptionQueue;
use crate::services::trigger_engine::TriggerEngine;
use crate::{debug_if_enabled, trace_if_enabled};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::info;

/// Режим подписки при обходе поддерева
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    /// Окно ещё в льготном периоде: только создание/уничтожение детей
    Pending,
    /// Полная маска, KeyPress только если это не нарушит доставку клиенту
    Settled,
}

/// Итог одного тика наблюдателя
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub created: usize,
    pub key_presses: usize,
    pub promoted: usize,
}

/// Следит за всем деревом окон и сообщает о нажатиях клавиш, не мешая
/// обычной доставке событий приложениям.
pub struct WindowTreeWatcher {
    queue: SubscriptionQueue,
    grace_period: Duration,
}

impl WindowTreeWatcher {
    pub fn new(grace_period: Duration) -> Self {
        info!("Инициализация WindowTreeWatcher (льготный период: {:?})", grace_period);
        Self {
            queue: SubscriptionQueue::new(),
            grace_period,
        }
    }

    /// Обходит деревья всех экранов и ставит корни в очередь
    pub fn initialize(&mut self, display: &dyn DisplayClient, now: Instant) -> Result<()> {
        let roots = display.roots();
        info!("Подписываемся на дерево окон {} экран(ов)", roots.len());

        for root in roots {
            Self::select_events(display, root, SubscriptionMode::Pending, self.queue.young())?;
            self.queue.enqueue(root, now);
        }

        Ok(())
    }

    /// Устанавливает маску событий на окно и всех его потомков.
    ///
    /// Окно, исчезнувшее посреди обхода, просто пропускается вместе с
    /// поддеревом. Повторный обход того же поддерева безвреден: установка
    /// маски идемпотентна.
    ///
    /// Окна из `young` ещё в льготном периоде: в режиме `Settled` они
    /// получают только маску подструктуры, а обход идёт дальше в их детей.
    pub fn select_events(
        display: &dyn DisplayClient,
        window: WindowId,
        mode: SubscriptionMode,
        young: &HashSet<WindowId>,
    ) -> Result<()> {
        let mut stack = vec![window];

        while let Some(window) = stack.pop() {
            let Some(tree) = display.query_tree(window)? else {
                trace_if_enabled!("Окно 0x{:x} исчезло до подписки", window);
                continue;
            };

            let interest = match mode {
                SubscriptionMode::Pending => EventInterest::Substructure,
                SubscriptionMode::Settled if young.contains(&window) => EventInterest::Substructure,
                // У корня нет приложения-владельца, перехватывать нечего
                SubscriptionMode::Settled if tree.is_root() => EventInterest::SubstructureAndKeys,
                SubscriptionMode::Settled => match display.key_press_claims(window)? {
                    Some(claims) if claims.allows_claim() => EventInterest::SubstructureAndKeys,
                    Some(_) => EventInterest::Substructure,
                    None => continue,
                },
            };

            display.select_input(window, interest)?;

            // Дети могли появиться между первым запросом и установкой маски
            let Some(tree) = display.query_tree(window)? else {
                continue;
            };

            stack.extend(tree.children.into_iter().rev());
        }

        Ok(())
    }

    /// Неблокирующе разбирает накопившиеся события и продвигает окна,
    /// чей льготный период истёк.
    pub fn poll_once(
        &mut self,
        display: &dyn DisplayClient,
        engine: &mut dyn TriggerEngine,
        now: Instant,
    ) -> Result<PollSummary> {
        let mut summary = PollSummary::default();

        while let Some(event) = display.poll_event()? {
            match event {
                DisplayEvent::Created { window } => {
                    debug_if_enabled!("Новое окно 0x{:x}, откладываем полную подписку", window);
                    self.queue.enqueue(window, now);
                    Self::select_events(display, window, SubscriptionMode::Pending, self.queue.young())?;
                    summary.created += 1;
                }
                event if event.is_genuine_key_press() => {
                    engine.on_activity();
                    summary.key_presses += 1;
                }
                _ => {}
            }
        }

        summary.promoted = self.queue.drain_eligible(now, self.grace_period, |window, young| {
            debug_if_enabled!("Льготный период окна 0x{:x} истёк, полная подписка", window);
            Self::select_events(display, window, SubscriptionMode::Settled, young)
        })?;

        Ok(summary)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
