/*!
Определяет очень простой логгер, который работает с крейтом `log`.

Ничего сложного здесь нет: нужны только уровни логов и вывод в stderr,
поэтому мы обходимся без дополнительных зависимостей.
*/

use log::Log;

/// Простейший логгер, который логирует в stderr.
///
/// Фильтрацию этот логгер не выполняет: она делается самим крейтом
/// `log` через его глобальную настройку max_level.
#[derive(Debug)]
pub(crate) struct Logger(());

/// Одиночка, используемый как цель для реализации трейта `Log`.
const LOGGER: &'static Logger = &Logger(());

impl Logger {
    /// Создать логгер, пишущий в stderr, и установить его глобальным.
    /// Если при установке возникла проблема, возвращается ошибка.
    pub(crate) fn init() -> Result<(), log::SetLoggerError> {
        log::set_logger(LOGGER)
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        // Уровень лога устанавливается через log::set_max_level, поэтому
        // здесь фильтровать нечего.
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => {
                eprintln_locked!(
                    "{}|{}|{}:{}: {}",
                    record.level(),
                    record.target(),
                    file,
                    line,
                    record.args()
                );
            }
            _ => {
                eprintln_locked!(
                    "{}|{}: {}",
                    record.level(),
                    record.target(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {
        // eprintln_locked! сбрасывается при каждом вызове.
    }
}
