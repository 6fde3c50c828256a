/*!
Точка входа в trigtee.

Программа копирует stdin в stdout. Без дополнительных указаний она ведёт
себя как cat(1). Командная строка может также задать триггеры: шаблоны,
которые ищутся во входном потоке, и внешние команды, запускаемые на
каждое их совпадение.
*/

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;

#[macro_use]
mod messages;

mod args;
mod logger;

fn main() -> ExitCode {
    match run(args::parse()) {
        Ok(code) => code,
        Err(err) => {
            // Ищем ошибку разрыва канала. В этом случае выходим «грациозно»
            // с кодом успеха, по существующему соглашению Unix. Среда
            // выполнения Rust не запрашивает сигналы PIPE, поэтому вместо
            // сигнала мы получаем ошибку I/O и обрабатываем её явно.
            for cause in err.chain() {
                if let Some(ioerr) = cause.downcast_ref::<std::io::Error>() {
                    if ioerr.kind() == std::io::ErrorKind::BrokenPipe {
                        return ExitCode::from(0);
                    }
                }
            }
            eprintln_locked!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Основная точка входа для trigtee.
fn run(result: args::ParseResult) -> anyhow::Result<ExitCode> {
    let args = match result {
        args::ParseResult::Err(err) => return Err(err),
        args::ParseResult::Special(mode) => {
            println!("{}", mode.text());
            return Ok(ExitCode::from(0));
        }
        args::ParseResult::Ok(args) => args,
    };

    let triggers = build_triggers(&args)?;
    let stdin = std::io::stdin().lock();
    // stdout намеренно не блокируется на всё время копирования: потоки
    // действий пишут диагностику через eprintln_locked!, который берёт ту
    // же блокировку stdout на каждую строку.
    let stdout = std::io::stdout();
    trigger::copy(stdin, stdout, &triggers).context("copy failed")?;
    Ok(ExitCode::from(0))
}

/// Построить триггеры из разобранных спецификаций.
///
/// Ошибка конфигурации любого триггера прерывает запуск целиком: лучше
/// отказаться сразу, чем молча копировать без части триггеров.
fn build_triggers(args: &args::Args) -> anyhow::Result<Vec<trigger::Trigger>> {
    let action: Arc<dyn trigger::Action> =
        Arc::new(trigger::CommandAction::new());
    let mut triggers = vec![];
    for spec in args.triggers.iter() {
        let trigger = trigger::TriggerBuilder::new()
            .buffer_limit(args.bufsize)
            .pipe(spec.pipe)
            .action(Arc::clone(&action))
            .build(&spec.pattern, &spec.command, spec.args.clone())
            .with_context(|| format!("parsing trigger {:?}", spec.pattern))?;
        log::debug!(
            "триггер {:?}: режим {}",
            spec.pattern,
            if trigger.pattern().spans_lines() {
                "многострочный"
            } else {
                "построчный"
            },
        );
        triggers.push(trigger);
    }
    Ok(triggers)
}
