use std::ffi::OsString;

/// Длинные опции, которые исторически пишутся с одним дефисом (`-locknow`)
const LEGACY_LONG_OPTIONS: &[&str] = &[
    "disable",
    "enable",
    "toggle",
    "exit",
    "locknow",
    "unlocknow",
    "restart",
    "time",
    "locker",
    "nowlocker",
    "killtime",
    "killer",
    "notify",
    "notifier",
    "secure",
    "detectsleep",
    "config",
    "display",
    "dry-run",
    "log-level",
    "help",
    "version",
];

/// Переписывает `-name` в `--name` для известных длинных опций, чтобы clap
/// понимал и старое написание. Всё после `--` не трогаем.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut seen_terminator = false;

    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            if index == 0 || seen_terminator {
                return arg;
            }

            match arg.to_str() {
                Some("--") => {
                    seen_terminator = true;
                    arg
                }
                Some(text) => match text.strip_prefix('-') {
                    Some(name) if !name.starts_with('-') && LEGACY_LONG_OPTIONS.contains(&name) => {
                        OsString::from(format!("-{}", text))
                    }
                    _ => arg,
                },
                None => arg,
            }
        })
        .collect()
}
