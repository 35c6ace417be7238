use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

#[derive(Error, Debug)]
pub enum AutolockError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Не удалось подключиться к X-серверу: {0}")]
    Connect(#[from] ConnectError),

    #[error("Соединение с X-сервером потеряно: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Ошибка ответа X-сервера: {0}")]
    Reply(#[from] ReplyError),

    #[error("Не удалось найти запущенный {0}")]
    NoRunningInstance(String),

    #[error("Нет процесса с PID {0}, либо процесс принадлежит другому пользователю")]
    OwnerUnreachable(i32),

    #[error("{program} уже запущен (PID {pid})")]
    AlreadyRunning { program: String, pid: i32 },

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl AutolockError {
    pub fn no_running_instance<T>(program: impl Into<String>) -> Result<T> {
        Err(AutolockError::NoRunningInstance(program.into()))
    }
}

pub type Result<T> = std::result::Result<T, AutolockError>;
