/*!
Запуск внешнего действия.

Ядру нужна только абстрактная способность «выполни команду с этими
аргументами и этой необязательной входной нагрузкой» — это трейт
[`Action`]. Реализация по умолчанию, [`CommandAction`], порождает
внешний процесс. Его вывод перенаправляется в stderr: stdout занят
основной копией потока и должен оставаться нетронутым.
*/

use std::{
    io::{self, Write},
    process,
};

use bstr::ByteSlice;

/// Один готовый к выполнению запуск действия: имя команды, уже
/// подставленные аргументы и необязательная входная нагрузка.
///
/// Значение переживает ровно одну отправку и после неё не используется.
#[derive(Clone, Debug)]
pub struct Invocation {
    command: String,
    args: Vec<Vec<u8>>,
    payload: Option<Vec<u8>>,
}

impl Invocation {
    pub(crate) fn new(
        command: String,
        args: Vec<Vec<u8>>,
        payload: Option<Vec<u8>>,
    ) -> Invocation {
        Invocation { command, args, payload }
    }

    /// Имя команды.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Аргументы с уже подставленными подвыражениями.
    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// Входная нагрузка канального режима, если он включён.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }
}

/// Способность выполнить внешнее действие.
///
/// Выполнение синхронное: возврат из `invoke` означает, что действие
/// завершилось, а не только запустилось. Асинхронность и сериализацию
/// обеспечивает вызывающий триггер.
pub trait Action: Send + Sync + std::fmt::Debug {
    /// Выполнить действие и дождаться его завершения.
    fn invoke(&self, inv: &Invocation) -> Result<(), CommandError>;
}

/// Действие по умолчанию: запуск внешней команды.
#[derive(Clone, Debug, Default)]
pub struct CommandAction(());

impl CommandAction {
    /// Создать действие, запускающее внешнюю команду.
    pub fn new() -> CommandAction {
        CommandAction(())
    }
}

impl Action for CommandAction {
    fn invoke(&self, inv: &Invocation) -> Result<(), CommandError> {
        let mut cmd = process::Command::new(inv.command());
        for arg in inv.args().iter() {
            cmd.arg::<&std::ffi::OsStr>(arg.to_os_str_lossy().as_ref());
        }
        cmd.stdout(process::Stdio::piped());
        cmd.stderr(process::Stdio::piped());
        cmd.stdin(if inv.payload().is_some() {
            process::Stdio::piped()
        } else {
            process::Stdio::null()
        });

        let mut child = cmd.spawn().map_err(CommandError::io)?;
        // Нагрузка пишется из отдельного потока, чтобы шумный процесс не
        // завис на заполненном канале, пока мы ждём его вывод.
        let mut feeder = None;
        if let Some(payload) = inv.payload() {
            if let Some(mut stdin) = child.stdin.take() {
                let payload = payload.to_vec();
                feeder = Some(std::thread::spawn(move || {
                    stdin.write_all(&payload)
                }));
            }
        }
        let output = child.wait_with_output().map_err(CommandError::io)?;
        if let Some(handle) = feeder {
            let result =
                handle.join().expect("stdin feeding thread does not panic");
            match result {
                // Команда вправе не дочитать свой вход.
                Err(ref err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(err) => return Err(CommandError::io(err)),
                Ok(()) => {}
            }
        }

        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(&output.stdout);
        if output.status.success() {
            let _ = stderr.write_all(&output.stderr);
            Ok(())
        } else {
            Err(CommandError::stderr(output.status, output.stderr))
        }
    }
}

/// Ошибка, которая может возникнуть при выполнении команды.
#[derive(Debug)]
pub struct CommandError {
    kind: CommandErrorKind,
}

#[derive(Debug)]
enum CommandErrorKind {
    Io(io::Error),
    Stderr { status: process::ExitStatus, bytes: Vec<u8> },
}

impl CommandError {
    /// Создать ошибку из ошибки I/O.
    pub(crate) fn io(ioerr: io::Error) -> CommandError {
        CommandError { kind: CommandErrorKind::Io(ioerr) }
    }

    /// Создать ошибку из неуспешного статуса выхода и содержимого stderr
    /// (которое может быть пустым).
    pub(crate) fn stderr(
        status: process::ExitStatus,
        bytes: Vec<u8>,
    ) -> CommandError {
        CommandError { kind: CommandErrorKind::Stderr { status, bytes } }
    }
}

impl std::error::Error for CommandError {}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            CommandErrorKind::Io(ref e) => e.fmt(f),
            CommandErrorKind::Stderr { ref status, ref bytes } => {
                let msg = String::from_utf8_lossy(bytes);
                if msg.trim().is_empty() {
                    write!(f, "command failed with {status}")
                } else {
                    write!(
                        f,
                        "command failed with {status}: {msg}",
                        msg = msg.trim(),
                    )
                }
            }
        }
    }
}
