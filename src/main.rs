use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::{Config, ConfigOverrides};
use events::Command;
use services::{
    create_display_client,
    BusAction,
    DisplayClient,
    InstanceMessageBus,
    Scheduler,
    StartupOutcome,
    WindowTreeWatcher,
};
use utils::SignalProbe;

#[derive(Parser, Debug)]
#[command(name = "xautolock", version)]
#[command(about = "Запускает блокировщик экрана после заданного периода бездействия")]
#[command(group(ArgGroup::new("message").multiple(false)))]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "xautolock.toml")]
    config: String,

    /// X-дисплей (по умолчанию $DISPLAY)
    #[arg(long)]
    display: Option<String>,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования
    #[arg(long)]
    log_level: Option<String>,

    /// Минут бездействия до блокировки
    #[arg(long, value_name = "MINUTES")]
    time: Option<u64>,

    /// Команда блокировщика
    #[arg(long)]
    locker: Option<String>,

    /// Команда блокировщика для -locknow
    #[arg(long = "nowlocker")]
    now_locker: Option<String>,

    /// Минут после блокировки до запуска killer
    #[arg(long = "killtime", value_name = "MINUTES")]
    kill_time: Option<u64>,

    /// Команда, запускаемая после killtime
    #[arg(long)]
    killer: Option<String>,

    /// За сколько секунд до блокировки запускать notifier
    #[arg(long, value_name = "SECONDS")]
    notify: Option<u64>,

    /// Команда уведомления о скорой блокировке
    #[arg(long)]
    notifier: Option<String>,

    /// Игнорировать команды от других копий
    #[arg(long)]
    secure: bool,

    /// Сбрасывать таймер после сна машины
    #[arg(long = "detectsleep")]
    detect_sleep: bool,

    /// Отключить работающую копию
    #[arg(long, group = "message")]
    disable: bool,

    /// Включить работающую копию
    #[arg(long, group = "message")]
    enable: bool,

    /// Переключить работающую копию
    #[arg(long, group = "message")]
    toggle: bool,

    /// Завершить работающую копию
    #[arg(long, group = "message")]
    exit: bool,

    /// Немедленно заблокировать экран
    #[arg(long = "locknow", group = "message")]
    lock_now: bool,

    /// Немедленно снять блокировку
    #[arg(long = "unlocknow", group = "message")]
    unlock_now: bool,

    /// Перезапустить работающую копию
    #[arg(long, group = "message")]
    restart: bool,
}

impl Args {
    fn requested_command(&self) -> Command {
        match () {
            _ if self.disable => Command::Disable,
            _ if self.enable => Command::Enable,
            _ if self.toggle => Command::Toggle,
            _ if self.exit => Command::Exit,
            _ if self.lock_now => Command::LockNow,
            _ if self.unlock_now => Command::UnlockNow,
            _ if self.restart => Command::Restart,
            _ => Command::None,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_level: self.log_level.clone(),
            lock_minutes: self.time,
            kill_minutes: self.kill_time,
            notify_seconds: self.notify,
            locker: self.locker.clone(),
            now_locker: self.now_locker.clone(),
            killer: self.killer.clone(),
            notifier: self.notifier.clone(),
            secure: self.secure,
            detect_sleep: self.detect_sleep,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Исходные аргументы нужны для перезапуска по команде restart
    let argv: Vec<OsString> = std::env::args_os().collect();
    let args = Args::parse_from(utils::normalize_legacy_flags(argv.clone()));

    // Загрузка конфигурации
    let config = Config::load(&args.config, &args.overrides())?;

    // Инициализация системы логирования
    init_tracing(&config.logging.level, &config.logging.format)?;

    for notice in config.notices() {
        warn!("{}", notice);
    }

    let program = argv
        .first()
        .map(|arg0| utils::process::program_name(&arg0.to_string_lossy()))
        .unwrap_or_else(|| "xautolock".to_string());

    info!("Запуск {} v{}", program, env!("CARGO_PKG_VERSION"));

    if args.dry_run {
        warn!("Режим сухого запуска - команды блокировки не выполняются");
    }

    let config = Arc::new(config);
    let display = create_display_client(args.display.as_deref())?;
    let display: &dyn DisplayClient = display.as_ref();

    // Переговоры с возможной уже работающей копией
    let mut bus = InstanceMessageBus::new(display, &program, config.control.secure)?;
    let command = args.requested_command();
    match bus.negotiate(display, command, std::process::id() as i32, &SignalProbe) {
        Ok(StartupOutcome::Delivered(command)) => {
            info!("Команда {} отправлена, завершаемся", command);
            return Ok(());
        }
        Ok(StartupOutcome::Claimed) => {}
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    }

    let mut scheduler = Scheduler::new(config.clone(), args.dry_run);
    let mut watcher = WindowTreeWatcher::new(config.grace_period());
    watcher.initialize(display, Instant::now())?;
    display.flush()?;

    info!("Все компоненты инициализированы");

    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut shutdown => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
        }

        match bus.poll_once(display, &mut scheduler)? {
            BusAction::Continue => {}
            BusAction::Exit => {
                info!("Завершение по команде exit. Пока!");
                return Ok(());
            }
            BusAction::Restart => {
                return Err(utils::process::restart(&argv).into());
            }
        }

        let now = Instant::now();
        scheduler.observe_tick(now);

        let summary = watcher.poll_once(display, &mut scheduler, now)?;
        if summary != Default::default() {
            debug!(
                "Тик: новых окон {}, нажатий {}, продвинуто {}, в очереди {}",
                summary.created,
                summary.key_presses,
                summary.promoted,
                watcher.pending()
            );
        }

        for action in scheduler.evaluate(now) {
            info!("Выполнено действие: {:?}", action);
        }

        display.flush()?;
    }

    debug!("Состояние триггеров при завершении: {:?}", scheduler.state());
    info!("{} завершил работу", program);
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
