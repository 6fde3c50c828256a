/*!
Вспомогательные типы для тестов триггеров.
*/

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::action::{Action, CommandError, Invocation};

/// Действие, записывающее свои запуски вместо выполнения команды.
///
/// Дополнительно отслеживает максимальное число одновременных
/// выполнений, чтобы проверять инвариант «не более одного в полёте»,
/// и умеет имитировать медленное или неудачное действие.
#[derive(Debug)]
pub(crate) struct RecordingAction {
    invocations: Mutex<Vec<Invocation>>,
    delay: Option<Duration>,
    fail: bool,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingAction {
    pub(crate) fn new() -> Arc<RecordingAction> {
        RecordingAction::build(None, false)
    }

    /// Действие, которое «выполняется» указанное время.
    pub(crate) fn with_delay(delay: Duration) -> Arc<RecordingAction> {
        RecordingAction::build(Some(delay), false)
    }

    /// Действие, каждый запуск которого завершается ошибкой.
    pub(crate) fn failing() -> Arc<RecordingAction> {
        RecordingAction::build(None, true)
    }

    fn build(delay: Option<Duration>, fail: bool) -> Arc<RecordingAction> {
        Arc::new(RecordingAction {
            invocations: Mutex::new(vec![]),
            delay,
            fail,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    /// Все записанные запуски, в порядке отправки.
    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Количество записанных запусков.
    pub(crate) fn count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    /// Подставленные аргументы каждого запуска, как строки.
    pub(crate) fn rendered_args(&self) -> Vec<Vec<String>> {
        self.invocations()
            .iter()
            .map(|inv| {
                inv.args()
                    .iter()
                    .map(|arg| String::from_utf8_lossy(arg).into_owned())
                    .collect()
            })
            .collect()
    }

    /// Наибольшее наблюдавшееся число одновременных выполнений.
    pub(crate) fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Action for RecordingAction {
    fn invoke(&self, inv: &Invocation) -> Result<(), CommandError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.invocations.lock().unwrap().push(inv.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            Err(CommandError::io(std::io::Error::other("simulated failure")))
        } else {
            Ok(())
        }
    }
}
