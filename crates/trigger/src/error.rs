/*!
Ошибки конфигурации, возникающие при создании триггера.
*/

/// Ошибка, которая может возникнуть при создании триггера.
///
/// Такие ошибки фатальны только для создаваемого триггера: триггер с
/// некорректной конфигурацией никогда не запускается. Решение о том,
/// прерывает ли это весь запуск, принимает вызывающий слой.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// Вид ошибки конфигурации.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Шаблон не является корректным регулярным выражением.
    Regex(String),
    /// Имя команды действия не задано.
    EmptyCommand,
}

impl Error {
    pub(crate) fn regex<E: std::fmt::Display>(err: E) -> Error {
        Error { kind: ErrorKind::Regex(err.to_string()) }
    }

    pub(crate) fn empty_command() -> Error {
        Error { kind: ErrorKind::EmptyCommand }
    }

    /// Вернуть вид этой ошибки.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::Regex(ref err) => err.fmt(f),
            ErrorKind::EmptyCommand => {
                write!(f, "trigger config error: empty command name")
            }
        }
    }
}
