/*!
Размножение входного потока.

Каждый прочитанный фрагмент сначала без изменений уходит в основной
выход, а затем — в каждый настроенный триггер. Основная копия потока
остаётся верной входу байт в байт независимо от того, сколько триггеров
настроено и совпадают ли они.
*/

use std::io::{self, Read, Write};

use crate::trigger::Trigger;

/// Размер фрагмента чтения.
const CHUNK_SIZE: usize = 8 * (1 << 10);

/// Копировать источник в основной выход, размножая каждый фрагмент во
/// все триггеры.
///
/// Внутри одного триггера фрагменты доставляются в порядке потока;
/// порядок между триггерами не определён. На конце источника (или при
/// ошибке I/O, которая завершает копирование так же, как конец потока)
/// каждый триггер закрывается, и все закрытия завершаются до возврата.
///
/// Возвращает количество скопированных байтов.
pub fn copy<R: Read, W: Write>(
    mut rdr: R,
    mut wtr: W,
    triggers: &[Trigger],
) -> io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    let result = loop {
        let n = match rdr.read(&mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                continue;
            }
            Err(err) => break Err(err),
        };
        if let Err(err) = wtr.write_all(&buf[..n]) {
            break Err(err);
        }
        total += n as u64;
        for trigger in triggers.iter() {
            trigger.write(&buf[..n]);
        }
    };
    for trigger in triggers.iter() {
        trigger.close();
    }
    match result {
        Ok(()) => {
            wtr.flush()?;
            Ok(total)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bstr::ByteSlice;

    use super::*;
    use crate::{
        action::Action,
        testutil::RecordingAction,
        trigger::{Trigger, TriggerBuilder},
    };

    fn trigger(
        pattern: &str,
        args: &[&str],
        action: &Arc<RecordingAction>,
    ) -> Trigger {
        TriggerBuilder::new()
            .action(Arc::clone(action) as Arc<dyn Action>)
            .build(
                pattern,
                "action",
                args.iter().map(|a| a.to_string()).collect(),
            )
            .unwrap()
    }

    #[test]
    fn passthru_without_triggers() {
        let input = b"homer\nlisa\nmaggie".to_vec();
        let mut out = vec![];
        let n = copy(&input[..], &mut out, &[]).unwrap();
        assert_eq!(out, input);
        assert_eq!(n, input.len() as u64);
    }

    #[test]
    fn passthru_is_byte_exact_with_triggers() {
        let input = b"ok\nERROR: one\nbinary \x00 bytes\nERROR: two".to_vec();
        let action = RecordingAction::new();
        let triggers = vec![trigger("ERROR", &["$0"], &action)];

        let mut out = vec![];
        copy(&input[..], &mut out, &triggers).unwrap();

        assert_eq!(out.as_bstr(), input.as_bstr());
        assert_eq!(action.count(), 2);
    }

    #[test]
    fn end_to_end_build_example() {
        let input = b"build started\nbuild finished in 3.2 seconds\n";
        let action = RecordingAction::new();
        let triggers = vec![trigger(
            r"build finished in (\d+\.\d+) seconds",
            &["Build complete after $1 seconds"],
            &action,
        )];

        let mut out = vec![];
        copy(&input[..], &mut out, &triggers).unwrap();

        assert_eq!(out.as_bstr(), input.as_bstr());
        assert_eq!(
            action.rendered_args(),
            vec![vec!["Build complete after 3.2 seconds"]],
        );
    }

    #[test]
    fn independent_triggers_both_drain_on_close() {
        let input = b"start\nmiddle\nfinal line without terminator";
        let line_action = RecordingAction::new();
        let multi_action = RecordingAction::new();
        let triggers = vec![
            trigger("final", &["$0"], &line_action),
            trigger(r"(?s)start.*middle", &["$0"], &multi_action),
        ];

        let mut out = vec![];
        copy(&input[..], &mut out, &triggers).unwrap();

        assert_eq!(out.as_bstr(), input.as_bstr());
        // Построчный триггер добирает незавершённую строку при закрытии.
        assert_eq!(line_action.rendered_args(), vec![vec!["final"]]);
        assert_eq!(
            multi_action.rendered_args(),
            vec![vec!["start\nmiddle"]],
        );
    }

    #[test]
    fn sink_error_still_closes_triggers() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("sink failed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let action = RecordingAction::new();
        let triggers = vec![trigger("never", &[], &action)];
        let input = b"data\n";
        assert!(copy(&input[..], FailingSink, &triggers).is_err());
        // Триггеры закрыты, запусков не было.
        assert_eq!(action.count(), 0);
    }
}
