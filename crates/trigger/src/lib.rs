/*!
Этот крейт предоставляет потоковые регулярные триггеры: байтовый поток
накапливается в буфере каждого триггера, сопоставляется с его шаблоном
построчно или сквозь границы строк, и на каждое совпадение запускается
внешнее действие с подстановкой подвыражений в его аргументы.

Ядро устроено из небольших частей:

* [`Pattern`] — скомпилированное регулярное выражение, которое один раз
  при создании классифицируется как построчное или многострочное.
* [`Trigger`] — пара «буфер + шаблон + действие» с контрактом записи
  потока ([`Trigger::write`]) и финального слива ([`Trigger::close`]).
* [`ActionTemplate`] и [`DispatchSlot`] — подстановка подвыражений и
  сериализация запусков: не более одного действия в полёте на триггер.
* [`CommandAction`] — запуск внешней команды; вывод команды уходит в
  stderr, чтобы основная копия потока оставалась нетронутой.
* [`copy`] — размножение входного потока в основной выход и во все
  триггеры.

# Пример

```no_run
use std::sync::Arc;

use trigtee_trigger::{CommandAction, TriggerBuilder, copy};

let trigger = TriggerBuilder::new()
    .action(Arc::new(CommandAction::new()))
    .build(
        r"build finished in (\d+\.\d+) seconds",
        "notify",
        vec!["Build complete after $1 seconds".to_string()],
    )?;
copy(std::io::stdin().lock(), std::io::stdout(), &[trigger])?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

#![deny(missing_docs)]

pub use crate::{
    action::{Action, CommandAction, CommandError, Invocation},
    dispatch::{ActionTemplate, DispatchSlot, Permit},
    error::{Error, ErrorKind},
    fanout::copy,
    pattern::Pattern,
    trigger::{DEFAULT_BUFFER_LIMIT, Trigger, TriggerBuilder},
};

mod action;
mod buffer;
mod dispatch;
mod error;
mod fanout;
mod pattern;
#[cfg(test)]
mod testutil;
mod trigger;
