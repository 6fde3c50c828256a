/*!
Макрос вывода диагностики в stderr.

Основная копия потока занимает stdout, а вся диагностика уходит в
stderr. Когда оба подключены к одному терминалу, строки могут
перемешиваться, поэтому перед записью в stderr мы берём блокировку
stdout.
*/

/// Как eprintln, но блокирует stdout для предотвращения перемешивания строк.
#[macro_export]
macro_rules! eprintln_locked {
    ($($tt:tt)*) => {{
        {
            use std::io::Write;

            // Мы намеренно берём блокировку stdout, хотя пишем в stderr:
            // основная копия потока идёт через ту же блокировку stdout,
            // и без этого диагностика вклинивалась бы в середину её строк.
            let stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr().lock();
            // Ошибки записи здесь осознанно игнорируются, кроме разрыва
            // канала: в этом случае выходим тихо, по соглашению Unix.
            if let Err(err) = write!(stderr, "trigtee: ") {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(2);
                }
            }
            if let Err(err) = writeln!(stderr, $($tt)*) {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(2);
                }
            }
            drop(stdout);
        }
    }}
}
