use crate::error::{AutolockError, Result};
use crate::events::{Command, WindowId};
use crate::services::display::{Atom, DisplayClient};
use crate::services::trigger_engine::TriggerEngine;
use crate::utils::LivenessProbe;
use crate::debug_if_enabled;
use tracing::{debug, info, warn};

const SEMAPHORE_SUFFIX: &str = "_SEMAPHORE_PID";
const MAILBOX_SUFFIX: &str = "_MESSAGE";

/// Имена свойств корневого окна, производные от имени программы, чтобы
/// сборки с разными именами не мешали друг другу
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    pub semaphore: String,
    pub mailbox: String,
}

impl ChannelNames {
    pub fn for_program(program: &str) -> Self {
        Self {
            semaphore: format!("{}{}", program, SEMAPHORE_SUFFIX).to_uppercase(),
            mailbox: format!("{}{}", program, MAILBOX_SUFFIX).to_uppercase(),
        }
    }
}

/// Чем закончились переговоры при старте
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Этот процесс стал активной копией
    Claimed,
    /// Команда доставлена работающей копии, больше делать нечего
    Delivered(Command),
}

/// Что должен сделать главный цикл после опроса почтового ящика
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAction {
    Continue,
    Exit,
    Restart,
}

/// Единственная копия на дисплей и передача ей команд через два свойства
/// корневого окна: семафор с PID владельца и почтовый ящик на одну команду.
///
/// Проверка семафора и запись в него не атомарны: две копии, стартовавшие
/// одновременно, обе могут посчитать себя владельцем. Это известное и
/// принятое ограничение.
pub struct InstanceMessageBus {
    program: String,
    root: WindowId,
    semaphore: Atom,
    mailbox: Atom,
    secure: bool,
    first_poll: bool,
}

impl InstanceMessageBus {
    pub fn new(display: &dyn DisplayClient, program: &str, secure: bool) -> Result<Self> {
        let names = ChannelNames::for_program(program);
        info!(
            "Инициализация InstanceMessageBus: {} / {} (secure: {})",
            names.semaphore, names.mailbox, secure
        );

        Ok(Self {
            program: program.to_string(),
            root: display.default_root(),
            semaphore: display.intern_atom(&names.semaphore)?,
            mailbox: display.intern_atom(&names.mailbox)?,
            secure,
            first_poll: true,
        })
    }

    /// Стартовые переговоры: либо захватить семафор, либо доставить команду
    /// уже работающей копии.
    pub fn negotiate(
        &self,
        display: &dyn DisplayClient,
        command: Command,
        own_pid: i32,
        probe: &dyn LivenessProbe,
    ) -> Result<StartupOutcome> {
        let owner = display.get_integer_property(self.root, self.semaphore)?;

        match owner {
            Some(pid) if probe.is_alive(pid) => {
                if command.is_none() {
                    return Err(AutolockError::AlreadyRunning {
                        program: self.program.clone(),
                        pid,
                    });
                }

                display.set_integer_property(self.root, self.mailbox, command.code())?;
                display.flush()?;
                info!("Команда {} доставлена процессу {}", command, pid);
                Ok(StartupOutcome::Delivered(command))
            }
            Some(pid) => {
                if !command.is_none() {
                    return Err(AutolockError::OwnerUnreachable(pid));
                }

                warn!("Семафор указывает на несуществующий процесс {}, занимаем его", pid);
                self.claim(display, own_pid)
            }
            None if !command.is_none() => AutolockError::no_running_instance(self.program.as_str()),
            None => self.claim(display, own_pid),
        }
    }

    fn claim(&self, display: &dyn DisplayClient, own_pid: i32) -> Result<StartupOutcome> {
        display.set_integer_property(self.root, self.semaphore, own_pid)?;
        display.flush()?;
        info!("{} запущен как активная копия (PID {})", self.program, own_pid);
        Ok(StartupOutcome::Claimed)
    }

    /// Забирает команду из почтового ящика и выполняет её.
    ///
    /// Ящик очищается до выполнения команды при любом содержимом. Первый
    /// вызов после старта выбрасывает найденное: это сообщение предназначалось
    /// предыдущей копии.
    pub fn poll_once(
        &mut self,
        display: &dyn DisplayClient,
        engine: &mut dyn TriggerEngine,
    ) -> Result<BusAction> {
        let value = display.get_integer_property(self.root, self.mailbox)?;
        display.delete_property(self.root, self.mailbox)?;
        display.flush()?;

        if std::mem::replace(&mut self.first_poll, false) {
            if let Some(code) = value {
                debug!("Отбрасываем устаревшее сообщение {}", code);
            }
            return Ok(BusAction::Continue);
        }

        let Some(code) = value else {
            return Ok(BusAction::Continue);
        };

        let Some(command) = Command::from_code(code) else {
            debug_if_enabled!("Неизвестный код сообщения {}, игнорируем", code);
            return Ok(BusAction::Continue);
        };

        if self.secure {
            info!("Режим secure: команда {} проигнорирована", command);
            return Ok(BusAction::Continue);
        }

        info!("Получена команда: {}", command);
        self.dispatch(display, command, engine)
    }

    fn dispatch(
        &self,
        display: &dyn DisplayClient,
        command: Command,
        engine: &mut dyn TriggerEngine,
    ) -> Result<BusAction> {
        match command {
            Command::None => {}
            Command::Disable => engine.set_disabled(true),
            Command::Enable => engine.set_disabled(false),
            Command::Toggle => {
                let disabled = !engine.is_disabled();
                engine.set_disabled(disabled);
            }
            Command::LockNow => {
                if !engine.is_disabled() {
                    engine.request_lock_now();
                }
            }
            Command::UnlockNow => {
                if !engine.is_disabled() {
                    engine.request_unlock_now();
                }
            }
            Command::Exit => return Ok(BusAction::Exit),
            Command::Restart => {
                display.delete_property(self.root, self.semaphore)?;
                display.flush()?;
                return Ok(BusAction::Restart);
            }
        }

        Ok(BusAction::Continue)
    }
}
