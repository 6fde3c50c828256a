/*!
Подстановка подвыражений и сериализация запусков действий.

Каждый триггер владеет одним [`DispatchSlot`] — однопермитным слотом,
который гарантирует не более одного выполняющегося действия на триггер.
Слот захватывается перед запуском действия и освобождается, когда его
выполнение (а не только запуск) завершилось.
*/

use std::sync::{Arc, Condvar, Mutex};

use crate::{action::Invocation, error::Error};

/// Неизменяемый шаблон действия: имя команды, шаблоны аргументов и
/// признак канального режима.
///
/// Шаблоны аргументов могут содержать плейсхолдеры подвыражений в
/// синтаксисе `$0`, `$1`, `$name` или `${name}`. Подстановка текстовая и
/// буквальная, никакой интерпретации оболочкой не происходит; не
/// участвовавшая в совпадении группа подставляется пустой строкой.
#[derive(Clone, Debug)]
pub struct ActionTemplate {
    command: String,
    args: Vec<String>,
    pipe: bool,
}

impl ActionTemplate {
    /// Создать шаблон действия.
    ///
    /// Пустое имя команды — это ошибка конфигурации.
    pub fn new(
        command: &str,
        args: Vec<String>,
        pipe: bool,
    ) -> Result<ActionTemplate, Error> {
        if command.is_empty() {
            return Err(Error::empty_command());
        }
        Ok(ActionTemplate { command: command.to_string(), args, pipe })
    }

    /// Имя команды.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Возвращает true, если совпавший текст подаётся действию на вход,
    /// а не через аргументы.
    pub fn is_pipe(&self) -> bool {
        self.pipe
    }

    /// Подставить подвыражения совпадения во все шаблоны аргументов и
    /// собрать готовый запуск.
    ///
    /// `text` — это совпавший текст, передаваемый как входная нагрузка в
    /// канальном режиме.
    pub(crate) fn render(
        &self,
        caps: &regex::bytes::Captures<'_>,
        text: &[u8],
    ) -> Invocation {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in self.args.iter() {
            let mut dst = vec![];
            caps.expand(arg.as_bytes(), &mut dst);
            args.push(dst);
        }
        let payload = if self.pipe { Some(text.to_vec()) } else { None };
        Invocation::new(self.command.clone(), args, payload)
    }
}

/// Однопермитный слот, сериализующий действия одного триггера.
///
/// Слот — это явная форма инварианта «не более одного действия в
/// полёте»: захват блокируется, пока предыдущее действие не завершилось,
/// и ожидающий захват никогда не отбрасывается.
#[derive(Clone, Debug)]
pub struct DispatchSlot {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    busy: Mutex<bool>,
    cond: Condvar,
}

impl DispatchSlot {
    /// Создать свободный слот.
    pub fn new() -> DispatchSlot {
        DispatchSlot {
            inner: Arc::new(Inner {
                busy: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    /// Захватить слот, дождавшись завершения предыдущего действия.
    ///
    /// Возвращённый пермит переносится в задачу действия и освобождает
    /// слот при уничтожении.
    pub fn acquire(&self) -> Permit {
        let mut busy = self.inner.busy.lock().unwrap();
        while *busy {
            busy = self.inner.cond.wait(busy).unwrap();
        }
        *busy = true;
        Permit { inner: Arc::clone(&self.inner) }
    }

    /// Дождаться, пока ни одно действие не останется в полёте.
    pub fn wait_idle(&self) {
        let mut busy = self.inner.busy.lock().unwrap();
        while *busy {
            busy = self.inner.cond.wait(busy).unwrap();
        }
    }

    /// Возвращает true, если действие сейчас в полёте.
    pub fn is_busy(&self) -> bool {
        *self.inner.busy.lock().unwrap()
    }
}

impl Default for DispatchSlot {
    fn default() -> DispatchSlot {
        DispatchSlot::new()
    }
}

/// Пермит захваченного слота. Уничтожение пермита освобождает слот.
#[derive(Debug)]
pub struct Permit {
    inner: Arc<Inner>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut busy = self.inner.busy.lock().unwrap();
        *busy = false;
        self.inner.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bstr::ByteSlice;

    use super::*;
    use crate::pattern::Pattern;

    fn render(
        pattern: &str,
        haystack: &str,
        args: &[&str],
        pipe: bool,
    ) -> Invocation {
        let p = Pattern::new(pattern).unwrap();
        let caps = p.captures(haystack.as_bytes()).unwrap();
        let text = caps.get(0).unwrap().as_bytes();
        let tpl = ActionTemplate::new(
            "action",
            args.iter().map(|a| a.to_string()).collect(),
            pipe,
        )
        .unwrap();
        tpl.render(&caps, text)
    }

    fn arg(inv: &Invocation, i: usize) -> &str {
        inv.args()[i].to_str().unwrap()
    }

    #[test]
    fn expand_whole_match_and_groups() {
        let inv = render(
            r"build finished in (\d+\.\d+) seconds",
            "build finished in 3.2 seconds",
            &["got: $0", "Build complete after $1 seconds"],
            false,
        );
        assert_eq!(arg(&inv, 0), "got: build finished in 3.2 seconds");
        assert_eq!(arg(&inv, 1), "Build complete after 3.2 seconds");
        assert_eq!(inv.payload(), None);
    }

    #[test]
    fn expand_named_and_unmatched() {
        let inv = render(
            r"(?P<word>\w+)(?P<opt>!)?",
            "hello",
            &["w=${word}", "opt=[$opt]", "missing=[$9]"],
            false,
        );
        assert_eq!(arg(&inv, 0), "w=hello");
        // Не участвовавшая группа и несуществующая группа пусты.
        assert_eq!(arg(&inv, 1), "opt=[]");
        assert_eq!(arg(&inv, 2), "missing=[]");
    }

    #[test]
    fn expand_literal_dollar() {
        let inv = render(r"\d+", "price 42", &["$$$0"], false);
        assert_eq!(arg(&inv, 0), "$42");
    }

    #[test]
    fn pipe_mode_payload() {
        let inv =
            render("ERROR.*", "ERROR: disk full", &["seen an error"], true);
        assert_eq!(arg(&inv, 0), "seen an error");
        assert_eq!(inv.payload().unwrap().as_bstr(), "ERROR: disk full");
    }

    #[test]
    fn empty_command_rejected() {
        assert!(ActionTemplate::new("", vec![], false).is_err());
    }

    #[test]
    fn slot_serializes() {
        let slot = DispatchSlot::new();
        assert!(!slot.is_busy());

        let permit = slot.acquire();
        assert!(slot.is_busy());

        let slot2 = slot.clone();
        let handle = std::thread::spawn(move || {
            // Блокируется, пока первый пермит не уничтожен.
            let permit = slot2.acquire();
            drop(permit);
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(slot.is_busy());

        drop(permit);
        handle.join().unwrap();
        slot.wait_idle();
        assert!(!slot.is_busy());
    }
}
