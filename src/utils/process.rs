use crate::error::AutolockError;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Проверка, жив ли процесс с данным PID, без посылки ему сигнала
pub trait LivenessProbe {
    fn is_alive(&self, pid: i32) -> bool;
}

impl<F: Fn(i32) -> bool> LivenessProbe for F {
    fn is_alive(&self, pid: i32) -> bool {
        self(pid)
    }
}

/// Пустой сигнал через kill(2). Ложно отрицательна для процесса на другой
/// машине или другого пользователя.
pub struct SignalProbe;

impl LivenessProbe for SignalProbe {
    fn is_alive(&self, pid: i32) -> bool {
        pid > 0 && kill(Pid::from_raw(pid), None).is_ok()
    }
}

/// Имя, под которым запущена программа: argv[0] без пути
pub fn program_name(argv0: &str) -> String {
    Path::new(argv0)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(argv0)
        .to_string()
}

/// Заменяет текущий процесс новой копией с исходными аргументами.
/// Возвращает управление только при ошибке.
pub fn restart(args: &[OsString]) -> AutolockError {
    let Some((program, rest)) = args.split_first() else {
        return AutolockError::Internal("пустой список аргументов".to_string());
    };

    info!("Перезапуск: {:?}", args);
    AutolockError::Io(Command::new(program).args(rest).exec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_name_strips_directories() {
        assert_eq!(program_name("/usr/bin/xautolock"), "xautolock");
        assert_eq!(program_name("./xautolock-dev"), "xautolock-dev");
        assert_eq!(program_name("xautolock"), "xautolock");
    }

    #[test]
    fn test_signal_probe_sees_own_process() {
        assert!(SignalProbe.is_alive(std::process::id() as i32));
        assert!(!SignalProbe.is_alive(0));
        assert!(!SignalProbe.is_alive(-1));
    }

    #[test]
    fn test_closure_probe() {
        let probe = |pid: i32| pid == 7;
        assert!(probe.is_alive(7));
        assert!(!probe.is_alive(8));
    }

    #[test]
    fn test_restart_rejects_empty_args() {
        assert!(matches!(restart(&[]), AutolockError::Internal(_)));
    }
}
