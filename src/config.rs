use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const MIN_LOCK_MINUTES: u64 = 1;
pub const MAX_LOCK_MINUTES: u64 = 60;
pub const MIN_KILL_MINUTES: u64 = 10;
pub const MAX_KILL_MINUTES: u64 = 120;
/// Верхняя граница льготного периода; должна оставаться меньше MIN_LOCK_MINUTES * 30 секунд
pub const MAX_GRACE_PERIOD_SECS: u64 = 45;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub timing: TimingConfig,
    pub commands: CommandsConfig,
    pub control: ControlConfig,
    // Предупреждения нормализации: логирование ещё не настроено, выводятся позже
    #[serde(skip)]
    notices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    pub lock_minutes: u64,
    pub kill_minutes: u64,
    /// За сколько секунд до блокировки запускать notifier (0 - не уведомлять)
    pub notify_seconds: u64,
    pub grace_period_secs: u64,
    pub tick_interval_ms: u64,
    pub detect_sleep: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandsConfig {
    pub locker: String,
    #[serde(default)]
    pub now_locker: Option<String>,
    #[serde(default)]
    pub killer: Option<String>,
    #[serde(default)]
    pub notifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Игнорировать все команды, присланные другими копиями программы
    pub secure: bool,
}

/// Значения из командной строки, перекрывающие файл и окружение
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub lock_minutes: Option<u64>,
    pub kill_minutes: Option<u64>,
    pub notify_seconds: Option<u64>,
    pub locker: Option<String>,
    pub now_locker: Option<String>,
    pub killer: Option<String>,
    pub notifier: Option<String>,
    pub secure: bool,
    pub detect_sleep: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
            timing: TimingConfig {
                lock_minutes: 10,
                kill_minutes: 20,
                notify_seconds: 0,
                grace_period_secs: 30,
                tick_interval_ms: 1000,
                detect_sleep: false,
            },
            commands: CommandsConfig {
                locker: "xlock".to_string(),
                now_locker: None,
                killer: None,
                notifier: None,
            },
            control: ControlConfig { secure: false },
            notices: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P, overrides: &ConfigOverrides) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("XAUTOLOCK_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.apply_overrides(overrides);
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(minutes) = overrides.lock_minutes {
            self.timing.lock_minutes = minutes;
        }
        if let Some(minutes) = overrides.kill_minutes {
            if overrides.killer.is_none() && self.commands.killer.is_none() {
                self.notice("Использовать -killtime без -killer не имеет смысла".to_string());
            }
            self.timing.kill_minutes = minutes;
        }
        if let Some(seconds) = overrides.notify_seconds {
            self.timing.notify_seconds = seconds;
        }
        if let Some(locker) = &overrides.locker {
            // -locker задаёт и обычный, и немедленный блокировщик
            self.commands.locker = locker.clone();
            self.commands.now_locker = None;
        }
        if overrides.now_locker.is_some() {
            self.commands.now_locker = overrides.now_locker.clone();
        }
        if overrides.killer.is_some() {
            self.commands.killer = overrides.killer.clone();
        }
        if overrides.notifier.is_some() {
            self.commands.notifier = overrides.notifier.clone();
        }
        self.control.secure |= overrides.secure;
        self.timing.detect_sleep |= overrides.detect_sleep;
    }

    /// Приводит значения к допустимым диапазонам с предупреждением
    pub fn normalize(&mut self) {
        let timing = &mut self.timing;
        let notices = &mut self.notices;

        if timing.lock_minutes < MIN_LOCK_MINUTES {
            timing.lock_minutes = MIN_LOCK_MINUTES;
            notices.push(format!("Время блокировки установлено в минимум: {} мин.", MIN_LOCK_MINUTES));
        } else if timing.lock_minutes > MAX_LOCK_MINUTES {
            timing.lock_minutes = MAX_LOCK_MINUTES;
            notices.push(format!("Время блокировки установлено в максимум: {} мин.", MAX_LOCK_MINUTES));
        }

        if timing.kill_minutes < MIN_KILL_MINUTES {
            timing.kill_minutes = MIN_KILL_MINUTES;
            notices.push(format!("Время killer установлено в минимум: {} мин.", MIN_KILL_MINUTES));
        } else if timing.kill_minutes > MAX_KILL_MINUTES {
            timing.kill_minutes = MAX_KILL_MINUTES;
            notices.push(format!("Время killer установлено в максимум: {} мин.", MAX_KILL_MINUTES));
        }

        if self.commands.notifier.is_some() && timing.notify_seconds == 0 {
            notices.push("Использовать -notifier без -notify не имеет смысла".to_string());
        }

        let half_lock = timing.lock_minutes * 60 / 2;
        if timing.notify_seconds > half_lock {
            timing.notify_seconds = half_lock;
            notices.push(format!("Время уведомления сброшено до {} с.", half_lock));
        }
    }

    fn notice(&mut self, message: String) {
        self.notices.push(message);
    }

    /// Предупреждения, накопленные при загрузке
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.timing.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms должно быть больше 0");
        }

        if self.timing.grace_period_secs == 0 || self.timing.grace_period_secs > MAX_GRACE_PERIOD_SECS {
            anyhow::bail!(
                "grace_period_secs должно быть в диапазоне 1..={}",
                MAX_GRACE_PERIOD_SECS
            );
        }

        if self.commands.locker.trim().is_empty() {
            anyhow::bail!("Не задана команда блокировщика");
        }

        Ok(())
    }

    pub fn lock_delay(&self) -> Duration {
        Duration::from_secs(self.timing.lock_minutes * 60)
    }

    pub fn kill_delay(&self) -> Duration {
        Duration::from_secs(self.timing.kill_minutes * 60)
    }

    pub fn notify_margin(&self) -> Duration {
        Duration::from_secs(self.timing.notify_seconds)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.timing.grace_period_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timing.tick_interval_ms)
    }

    pub fn now_locker(&self) -> &str {
        self.commands
            .now_locker
            .as_deref()
            .unwrap_or(&self.commands.locker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lock_delay(), Duration::from_secs(600));
        assert_eq!(config.now_locker(), "xlock");
    }

    #[test]
    fn test_normalize_clamps_times() {
        let mut config = Config::default();
        config.timing.lock_minutes = 0;
        config.timing.kill_minutes = 500;
        config.normalize();

        assert_eq!(config.timing.lock_minutes, MIN_LOCK_MINUTES);
        assert_eq!(config.timing.kill_minutes, MAX_KILL_MINUTES);
        assert_eq!(config.notices().len(), 2);
    }

    #[test]
    fn test_notify_margin_limited_to_half_lock_time() {
        let mut config = Config::default();
        config.timing.lock_minutes = 2;
        config.timing.notify_seconds = 300;
        config.normalize();

        assert_eq!(config.timing.notify_seconds, 60);
    }

    #[test]
    fn test_validate_rejects_bad_grace_period() {
        let mut config = Config::default();
        config.timing.grace_period_secs = 0;
        assert!(config.validate().is_err());

        config.timing.grace_period_secs = 46;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_locker_override_resets_now_locker() {
        let mut config = Config::default();
        config.commands.now_locker = Some("slock".to_string());

        let overrides = ConfigOverrides {
            locker: Some("i3lock".to_string()),
            secure: true,
            ..ConfigOverrides::default()
        };
        config.apply_overrides(&overrides);

        assert_eq!(config.now_locker(), "i3lock");
        assert!(config.control.secure);
    }

    #[test]
    fn test_load_merges_file_env_and_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "xautolock.toml",
                r#"
                    [timing]
                    lock_minutes = 5

                    [commands]
                    locker = "slock"
                "#,
            )?;
            jail.set_env("XAUTOLOCK_CONTROL__SECURE", "true");

            let overrides = ConfigOverrides {
                kill_minutes: Some(30),
                killer: Some("systemctl suspend".to_string()),
                ..ConfigOverrides::default()
            };
            let config = Config::load("xautolock.toml", &overrides).expect("конфигурация");

            assert_eq!(config.timing.lock_minutes, 5);
            assert_eq!(config.timing.kill_minutes, 30);
            assert_eq!(config.timing.grace_period_secs, 30);
            assert_eq!(config.commands.locker, "slock");
            assert!(config.control.secure);
            Ok(())
        });
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load("missing.toml", &ConfigOverrides::default()).expect("конфигурация");
            assert_eq!(config.timing.lock_minutes, 10);
            assert!(!config.control.secure);
            Ok(())
        });
    }
}
