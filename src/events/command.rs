use serde::{Deserialize, Serialize};
use std::fmt;

/// Команда, которую одна копия программы передаёт другой через почтовый ящик
/// на корневом окне.
///
/// Числовые коды стабильны и совпадают у всех совместимых сборок.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[default]
    None,
    Disable,
    Enable,
    Toggle,
    Exit,
    LockNow,
    UnlockNow,
    Restart,
}

impl Command {
    pub fn code(self) -> i32 {
        match self {
            Command::None => 0,
            Command::Disable => 1,
            Command::Enable => 2,
            Command::Toggle => 3,
            Command::Exit => 4,
            Command::LockNow => 5,
            Command::UnlockNow => 6,
            Command::Restart => 7,
        }
    }

    /// Неизвестные коды дают `None`, их молча игнорируют
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Command::None),
            1 => Some(Command::Disable),
            2 => Some(Command::Enable),
            3 => Some(Command::Toggle),
            4 => Some(Command::Exit),
            5 => Some(Command::LockNow),
            6 => Some(Command::UnlockNow),
            7 => Some(Command::Restart),
            _ => None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Command::None
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::None => "none",
            Command::Disable => "disable",
            Command::Enable => "enable",
            Command::Toggle => "toggle",
            Command::Exit => "exit",
            Command::LockNow => "locknow",
            Command::UnlockNow => "unlocknow",
            Command::Restart => "restart",
        };
        write!(f, "{}", name)
    }
}
