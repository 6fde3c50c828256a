/*!
Разбирает аргументы командной строки в структурированное представление.
*/

use std::ffi::OsString;

/// Текст справки.
const USAGE: &str = "\
Usage: trigtee [options] [PATTERN COMMAND [ARG...]] ['::' PATTERN COMMAND [ARG...]]...

Copy standard input to standard output. Each trigger group names a
regular expression and a command with arguments; every match of the
expression in the input runs the command, with $0, $1, ..., $name
placeholders in the arguments replaced by the match and its capture
groups. Trigger groups are separated by a literal '::'.

A pattern that can match across line boundaries is searched against the
accumulated stream; any other pattern is tried one complete line at a
time. Command output goes to stderr so that stdout stays a faithful
copy of the input.

Options:
    -b, --bufsize BYTES   match buffer size limit in bytes (default 65536)
    -p, --pipe            feed the matched text to the command's stdin
    -v, --verbose         more verbose logging (repeat for trace)
    -h, --help            print this help
    -V, --version         print version";

/// Результат разбора аргументов CLI.
///
/// Это в основном `anyhow::Result`, но с одним дополнительным вариантом
/// для «специальных» режимов `-h/--help` и `-V/--version`, которые
/// коротко замыкают разбор.
#[derive(Debug)]
pub(crate) enum ParseResult {
    Special(SpecialMode),
    Ok(Args),
    Err(anyhow::Error),
}

/// Режим, при котором вместо копирования печатается служебный текст.
#[derive(Clone, Copy, Debug)]
pub(crate) enum SpecialMode {
    /// Показать справку.
    Help,
    /// Показать версию.
    Version,
}

impl SpecialMode {
    /// Текст, который нужно напечатать в этом режиме.
    pub(crate) fn text(self) -> String {
        match self {
            SpecialMode::Help => USAGE.to_string(),
            SpecialMode::Version => {
                format!("trigtee {}", env!("CARGO_PKG_VERSION"))
            }
        }
    }
}

/// Разобранные аргументы запуска.
#[derive(Debug)]
pub(crate) struct Args {
    /// Лимит буфера каждого триггера, в байтах.
    pub(crate) bufsize: usize,
    /// Спецификации триггеров, в порядке командной строки.
    pub(crate) triggers: Vec<TriggerSpec>,
}

/// Спецификация одного триггера из командной строки.
#[derive(Clone, Debug)]
pub(crate) struct TriggerSpec {
    pub(crate) pattern: String,
    pub(crate) command: String,
    pub(crate) args: Vec<String>,
    pub(crate) pipe: bool,
}

/// Разобрать аргументы CLI этого процесса.
///
/// Попутно устанавливает глобальный логгер и его уровень по числу
/// флагов `-v`.
pub(crate) fn parse() -> ParseResult {
    if let Err(err) = crate::logger::Logger::init() {
        let err = anyhow::anyhow!("failed to initialize logger: {err}");
        return ParseResult::Err(err);
    }
    match parse_impl(std::env::args_os().skip(1)) {
        Ok(Parsed::Special(mode)) => ParseResult::Special(mode),
        Ok(Parsed::Args(args)) => ParseResult::Ok(args),
        Err(err) => ParseResult::Err(err),
    }
}

enum Parsed {
    Special(SpecialMode),
    Args(Args),
}

fn parse_impl(
    rawargs: impl IntoIterator<Item = OsString>,
) -> anyhow::Result<Parsed> {
    use lexopt::{Arg, ValueExt};

    let mut bufsize = trigger::DEFAULT_BUFFER_LIMIT;
    let mut pipe = false;
    let mut verbosity = 0usize;
    let mut values: Vec<String> = vec![];

    let mut p = lexopt::Parser::from_args(rawargs);
    while let Some(arg) = p.next()? {
        match arg {
            Arg::Short('h') | Arg::Long("help") => {
                return Ok(Parsed::Special(SpecialMode::Help));
            }
            Arg::Short('V') | Arg::Long("version") => {
                return Ok(Parsed::Special(SpecialMode::Version));
            }
            Arg::Short('b') | Arg::Long("bufsize") => {
                bufsize = p.value()?.parse()?;
            }
            Arg::Short('p') | Arg::Long("pipe") => pipe = true,
            Arg::Short('v') | Arg::Long("verbose") => verbosity += 1,
            Arg::Value(value) => {
                // С первого позиционного аргумента всё оставшееся — это
                // группы триггеров; флаги команд (например `-w`) не должны
                // разбираться как наши собственные.
                values.push(value.string()?);
                for raw in p.raw_args()? {
                    values.push(raw.string()?);
                }
            }
            arg => return Err(arg.unexpected().into()),
        }
    }
    set_log_level(verbosity);

    let mut triggers = vec![];
    for group in values.split(|v| v.as_str() == "::") {
        if group.is_empty() {
            continue;
        }
        anyhow::ensure!(
            group.len() >= 2,
            "trigger group {:?} needs a pattern and a command \
             (usage: trigtee PATTERN COMMAND [ARG...])",
            group[0],
        );
        triggers.push(TriggerSpec {
            pattern: group[0].clone(),
            command: group[1].clone(),
            args: group[2..].to_vec(),
            pipe,
        });
    }
    Ok(Parsed::Args(Args { bufsize, triggers }))
}

/// Преобразовать число флагов `-v` в глобальный уровень лога.
fn set_log_level(verbosity: usize) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    log::set_max_level(level);
}
