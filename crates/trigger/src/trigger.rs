/*!
Триггер: пара «буфер + шаблон + действие» с контрактом записи потока.

Триггер принимает фрагменты потока, копит их в собственном буфере и на
каждое найденное совпадение отправляет действие. Блокировка буфера
удерживается строго на время «дописать + извлечь совпадения»; само
выполнение действия происходит целиком вне её, поэтому медленное
действие никогда не задерживает приём новых данных.
*/

use std::sync::{Arc, Mutex};

use bstr::ByteSlice;

use crate::{
    action::{Action, CommandAction, Invocation},
    buffer::{Buffer, LINE_TERM},
    dispatch::{ActionTemplate, DispatchSlot},
    error::Error,
    pattern::Pattern,
};

/// Лимит буфера по умолчанию, в байтах.
pub const DEFAULT_BUFFER_LIMIT: usize = 1 << 16; // 64 КБ

/// Конфигурация триггера. Фиксируется после создания.
#[derive(Clone, Debug)]
struct Config {
    buffer_limit: usize,
    pipe: bool,
    action: Arc<dyn Action>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            pipe: false,
            action: Arc::new(CommandAction::new()),
        }
    }
}

/// Конструктор для настройки триггера.
#[derive(Clone, Debug)]
pub struct TriggerBuilder {
    config: Config,
}

impl Default for TriggerBuilder {
    fn default() -> TriggerBuilder {
        TriggerBuilder::new()
    }
}

impl TriggerBuilder {
    /// Создать новый конструктор с конфигурацией по умолчанию.
    pub fn new() -> TriggerBuilder {
        TriggerBuilder { config: Config::default() }
    }

    /// Установить лимит буфера в байтах.
    ///
    /// Лимит ограничивает рост буфера, когда многострочный шаблон долго
    /// не находит совпадения: излишек сверх лимита отбрасывается с
    /// головы. На построчный режим лимит не влияет, потому что там
    /// несовпавшие строки отбрасываются сразу.
    pub fn buffer_limit(&mut self, limit: usize) -> &mut TriggerBuilder {
        self.config.buffer_limit = limit;
        self
    }

    /// Включить канальный режим: совпавший текст подаётся действию на
    /// вход, а не подставляется в аргументы.
    ///
    /// По умолчанию выключен.
    pub fn pipe(&mut self, yes: bool) -> &mut TriggerBuilder {
        self.config.pipe = yes;
        self
    }

    /// Установить способ выполнения действия.
    ///
    /// По умолчанию это [`CommandAction`], запускающий внешнюю команду.
    pub fn action(&mut self, action: Arc<dyn Action>) -> &mut TriggerBuilder {
        self.config.action = action;
        self
    }

    /// Построить триггер из шаблона, имени команды и шаблонов аргументов.
    ///
    /// Некорректный шаблон или пустое имя команды — это ошибка
    /// конфигурации, и триггер не создаётся.
    pub fn build(
        &self,
        pattern: &str,
        command: &str,
        args: Vec<String>,
    ) -> Result<Trigger, Error> {
        let pattern = Pattern::new(pattern)?;
        let template = ActionTemplate::new(command, args, self.config.pipe)?;
        Ok(Trigger {
            pattern,
            template,
            action: Arc::clone(&self.config.action),
            buffer_limit: self.config.buffer_limit,
            slot: DispatchSlot::new(),
            buffer: Mutex::new(Buffer::new()),
        })
    }
}

/// Один триггер: шаблон, собственный буфер, шаблон действия и слот
/// отправки.
///
/// Триггеры полностью независимы друг от друга и не разделяют никаких
/// ресурсов.
#[derive(Debug)]
pub struct Trigger {
    pattern: Pattern,
    template: ActionTemplate,
    action: Arc<dyn Action>,
    buffer_limit: usize,
    slot: DispatchSlot,
    buffer: Mutex<Buffer>,
}

impl Trigger {
    /// Шаблон этого триггера.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Принять очередной фрагмент потока.
    ///
    /// Фрагмент дописывается в буфер, после чего отправляются все
    /// доступные на данный момент совпадения. Возврат означает, что
    /// совпадения переданы на выполнение, но не что они выполнены.
    pub fn write(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let pending = {
            let mut buf = self.buffer.lock().unwrap();
            buf.append(chunk);
            self.pump(&mut buf, false)
        };
        self.dispatch(pending);
    }

    /// Завершить поток для этого триггера.
    ///
    /// Выполняется финальная попытка совпадения, при которой остаток
    /// буфера без терминатора считается последней строкой, после чего
    /// вызов блокируется, пока последнее действие не завершится.
    /// Вызывается ровно один раз, на конце потока.
    pub fn close(&self) {
        let pending = {
            let mut buf = self.buffer.lock().unwrap();
            self.pump(&mut buf, true)
        };
        self.dispatch(pending);
        self.slot.wait_idle();
    }

    /// Извлечь из буфера все доступные совпадения, потребляя
    /// сопоставленные и отброшенные байты.
    fn pump(&self, buf: &mut Buffer, drain: bool) -> Vec<Invocation> {
        let mut pending = vec![];
        if self.pattern.spans_lines() {
            self.pump_free_form(buf, &mut pending);
        } else {
            self.pump_lines(buf, drain, &mut pending);
        }
        pending
    }

    /// Свободный (многострочный) поиск: шаблон ищется по всему буферу.
    ///
    /// Совпадение потребляет буфер с головы до конца совпадения, так что
    /// не совпавшие байты перед ним отбрасываются вместе с ним и больше
    /// никогда не предлагаются поиску. Без совпадения излишек сверх
    /// лимита подрезается с головы.
    fn pump_free_form(&self, buf: &mut Buffer, pending: &mut Vec<Invocation>) {
        loop {
            if buf.is_empty() {
                return;
            }
            let (inv, end) = match self.pattern.captures(buf.data()) {
                None => {
                    buf.trim_to(self.buffer_limit);
                    return;
                }
                Some(caps) => {
                    let m = caps.get(0).unwrap();
                    log::trace!(
                        "шаблон {:?}: совпадение {:?}",
                        self.pattern.as_str(),
                        m.as_bytes().as_bstr(),
                    );
                    (self.template.render(&caps, m.as_bytes()), m.end())
                }
            };
            buf.consume(end);
            pending.push(inv);
            if end == 0 {
                // Шаблон совпал с пустотой: продвижения нет, выходим.
                return;
            }
        }
    }

    /// Построчный поиск: из головы буфера извлекаются полные строки, и
    /// каждая проверяется отдельно, без терминатора.
    ///
    /// Не совпавшие строки отбрасываются навсегда. Неполная строка в
    /// хвосте ждёт новых данных, а при сливе (`drain`) считается
    /// финальной строкой без терминатора.
    fn pump_lines(
        &self,
        buf: &mut Buffer,
        drain: bool,
        pending: &mut Vec<Invocation>,
    ) {
        while let Some(len) = buf.next_line(drain) {
            let inv = {
                let mut line = &buf.data()[..len];
                if line.last() == Some(&LINE_TERM) {
                    line = &line[..len - 1];
                }
                self.pattern.captures(line).map(|caps| {
                    log::trace!(
                        "шаблон {:?}: совпадение в строке {:?}",
                        self.pattern.as_str(),
                        line.as_bstr(),
                    );
                    let m = caps.get(0).unwrap();
                    self.template.render(&caps, m.as_bytes())
                })
            };
            buf.consume(len);
            if let Some(inv) = inv {
                pending.push(inv);
            }
        }
    }

    /// Передать готовые запуски на выполнение, по одному за раз.
    ///
    /// Захват слота ждёт завершения предыдущего действия, поэтому
    /// отправки одного триггера идут строго в порядке совпадений. Само
    /// действие выполняется в отдельном потоке, и его завершение
    /// освобождает слот.
    fn dispatch(&self, pending: Vec<Invocation>) {
        for inv in pending {
            let permit = self.slot.acquire();
            let action = Arc::clone(&self.action);
            log::debug!(
                "запуск {:?} с {} аргументами",
                inv.command(),
                inv.args().len(),
            );
            std::thread::spawn(move || {
                if let Err(err) = action.invoke(&inv) {
                    log::warn!(
                        "ошибка выполнения {:?}: {}",
                        inv.command(),
                        err
                    );
                }
                drop(permit);
            });
        }
    }

    /// Количество байтов, накопленных в буфере.
    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }
}
