use crate::config::Config;
use crate::debug_if_enabled;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::r#trait::TriggerEngine;

/// Разрыв между тиками, после которого считаем, что машина спала
const SLEEP_GAP: Duration = Duration::from_secs(3);

/// Общее состояние триггеров, принадлежащее единственной активной копии
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerState {
    pub disabled: bool,
    pub lock_now: bool,
    pub unlock_now: bool,
    pub lock_trigger: Instant,
    pub kill_trigger: Option<Instant>,
    pub notified: bool,
}

/// Что планировщик сделал на очередном тике
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerAction {
    Notify,
    Lock,
    LockNow,
    Unlock,
    Kill,
}

pub struct Scheduler {
    config: Arc<Config>,
    state: TriggerState,
    dry_run: bool,
    locker: Option<Child>,
    background: Vec<Child>,
    last_tick: Instant,
}

impl Scheduler {
    pub fn new(config: Arc<Config>, dry_run: bool) -> Self {
        info!("Инициализация Scheduler (dry_run: {})", dry_run);

        let now = Instant::now();
        let state = TriggerState {
            disabled: false,
            lock_now: false,
            unlock_now: false,
            lock_trigger: now + config.lock_delay(),
            kill_trigger: None,
            notified: false,
        };

        Self {
            config,
            state,
            dry_run,
            locker: None,
            background: Vec::new(),
            last_tick: now,
        }
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut TriggerState {
        &mut self.state
    }

    fn reset_lock_trigger_at(&mut self, now: Instant) {
        self.state.lock_trigger = now + self.config.lock_delay();
        self.state.notified = false;
    }

    /// Сдвигает оба триггера; триггер killer только если он уже взведён
    fn reset_triggers_at(&mut self, now: Instant) {
        self.reset_lock_trigger_at(now);
        if self.state.kill_trigger.is_some() {
            self.state.kill_trigger = Some(now + self.config.kill_delay());
        }
    }

    /// Killer отсчитывает время от момента блокировки
    fn arm_kill_trigger(&mut self, now: Instant) {
        if self.config.commands.killer.is_some() {
            self.state.kill_trigger = Some(now + self.config.kill_delay());
        }
    }

    /// Сбрасывает триггер блокировки, если между тиками прошло подозрительно много времени
    pub fn observe_tick(&mut self, now: Instant) {
        let gap = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        if self.config.timing.detect_sleep && gap > SLEEP_GAP {
            info!("Обнаружен скачок времени на {:?}, сбрасываем триггер блокировки", gap);
            self.reset_lock_trigger_at(now);
        }
    }

    /// Один шаг расписания; возвращает выполненные действия
    pub fn evaluate(&mut self, now: Instant) -> Vec<TriggerAction> {
        let mut actions = Vec::new();
        self.reap_children();

        if std::mem::take(&mut self.state.unlock_now) {
            if let Some(mut locker) = self.locker.take() {
                info!("Завершаем блокировщик по запросу unlocknow");
                if let Err(e) = locker.kill() {
                    warn!("Не удалось завершить блокировщик: {}", e);
                }
                if let Err(e) = locker.wait() {
                    warn!("Не удалось дождаться завершения блокировщика: {}", e);
                }
                actions.push(TriggerAction::Unlock);
            }
        }

        if self.state.disabled {
            self.state.lock_now = false;
            return actions;
        }

        if self.locker.is_some() {
            // Пока экран заблокирован, отсчёт до следующей блокировки не идёт
            self.state.lock_now = false;
            self.reset_lock_trigger_at(now);
        } else if std::mem::take(&mut self.state.lock_now) {
            let command = self.config.now_locker().to_string();
            self.start_locker(&command);
            self.reset_lock_trigger_at(now);
            self.arm_kill_trigger(now);
            actions.push(TriggerAction::LockNow);
        } else {
            if let Some(notifier) = self.config.commands.notifier.clone() {
                let margin = self.config.notify_margin();
                if !margin.is_zero() && !self.state.notified && now + margin >= self.state.lock_trigger {
                    self.run_in_background("notifier", &notifier);
                    self.state.notified = true;
                    actions.push(TriggerAction::Notify);
                }
            }

            if now >= self.state.lock_trigger {
                let command = self.config.commands.locker.clone();
                self.start_locker(&command);
                self.reset_lock_trigger_at(now);
                self.arm_kill_trigger(now);
                actions.push(TriggerAction::Lock);
            }
        }

        if let Some(kill_trigger) = self.state.kill_trigger {
            if now >= kill_trigger {
                if let Some(killer) = self.config.commands.killer.clone() {
                    self.run_in_background("killer", &killer);
                }
                self.state.kill_trigger = Some(now + self.config.kill_delay());
                actions.push(TriggerAction::Kill);
            }
        }

        actions
    }

    fn start_locker(&mut self, command: &str) {
        if self.dry_run {
            info!("[DRY RUN] Запуск блокировщика: {}", command);
            return;
        }

        info!("Запуск блокировщика: {}", command);
        match Self::spawn_shell(command) {
            Ok(child) => self.locker = Some(child),
            Err(e) => error!("Не удалось запустить блокировщик '{}': {}", command, e),
        }
    }

    fn run_in_background(&mut self, role: &str, command: &str) {
        if self.dry_run {
            info!("[DRY RUN] Запуск {}: {}", role, command);
            return;
        }

        info!("Запуск {}: {}", role, command);
        match Self::spawn_shell(command) {
            Ok(child) => self.background.push(child),
            Err(e) => error!("Не удалось запустить {} '{}': {}", role, command, e),
        }
    }

    fn spawn_shell(command: &str) -> std::io::Result<Child> {
        Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn()
    }

    fn reap_children(&mut self) {
        if let Some(locker) = self.locker.as_mut() {
            match locker.try_wait() {
                Ok(Some(status)) => {
                    info!("Блокировщик завершился: {}", status);
                    self.locker = None;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Не удалось опросить блокировщик: {}", e);
                    self.locker = None;
                }
            }
        }

        self.background.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug_if_enabled!("Фоновая команда завершилась: {}", status);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        });
    }
}

impl TriggerEngine for Scheduler {
    fn on_activity(&mut self) {
        self.reset_triggers_at(Instant::now());
    }

    fn set_disabled(&mut self, disabled: bool) {
        let now = Instant::now();
        self.state.disabled = disabled;

        if disabled {
            self.reset_lock_trigger_at(now);
            self.state.kill_trigger = None;
        } else {
            self.reset_triggers_at(now);
        }
    }

    fn is_disabled(&self) -> bool {
        self.state.disabled
    }

    fn reset_triggers(&mut self) {
        self.reset_triggers_at(Instant::now());
    }

    fn request_lock_now(&mut self) {
        self.state.lock_now = true;
    }

    fn request_unlock_now(&mut self) {
        self.state.unlock_now = true;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        info!("Scheduler завершает работу");
    }
}
