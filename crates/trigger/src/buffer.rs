/*!
Накопительный буфер одного триггера.

Буфер хранит байты потока, которые ещё не были сопоставлены и не были
отброшены. Он растёт только с хвоста (новые записи) и сокращается только
с головы: либо когда байты вошли в отправленное совпадение, либо когда
непосопоставленный излишек подрезается до настроенного лимита.
*/

/// Терминатор строки. Буфер и построчный поиск работают только с ним.
pub(crate) const LINE_TERM: u8 = b'\n';

/// Накопитель байтов с курсором чтения в голове.
///
/// Потреблённая голова не освобождается сразу: при следующей записи
/// непотреблённый остаток прокручивается в начало хранилища.
#[derive(Clone, Debug)]
pub(crate) struct Buffer {
    buf: Vec<u8>,
    pos: usize,
}

impl Buffer {
    /// Создать пустой буфер.
    pub(crate) fn new() -> Buffer {
        Buffer { buf: vec![], pos: 0 }
    }

    /// Непотреблённое содержимое буфера.
    pub(crate) fn data(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Количество непотреблённых байтов.
    pub(crate) fn len(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Возвращает true, если непотреблённых байтов нет.
    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Дописать байты в хвост буфера.
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.roll();
        self.buf.extend_from_slice(bytes);
    }

    /// Потребить указанное количество байтов с головы. Оно должно быть
    /// не больше, чем возвращает `len`.
    pub(crate) fn consume(&mut self, amt: usize) {
        assert!(amt <= self.len());
        self.pos += amt;
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
    }

    /// Отбросить излишек сверх лимита с головы буфера (старые байты
    /// первыми).
    ///
    /// Подрезка может уничтожить префикс будущего совпадения; это
    /// принятая неточность исходной семантики, а не дефект.
    pub(crate) fn trim_to(&mut self, limit: usize) {
        if self.len() > limit {
            let excess = self.len() - limit;
            self.consume(excess);
        }
    }

    /// Длина следующей полной строки в голове буфера, включая терминатор.
    ///
    /// Если терминатора ещё нет, то при `drain` весь остаток считается
    /// финальной строкой без терминатора, а иначе строка не готова и
    /// возвращается `None`. Пустой буфер строк не выдаёт никогда.
    pub(crate) fn next_line(&self, drain: bool) -> Option<usize> {
        let data = self.data();
        match memchr::memchr(LINE_TERM, data) {
            Some(i) => Some(i + 1),
            None if drain && !data.is_empty() => Some(data.len()),
            None => None,
        }
    }

    /// Прокрутить непотреблённый остаток в начало хранилища.
    fn roll(&mut self) {
        if self.pos == 0 {
            return;
        }
        let len = self.len();
        self.buf.copy_within(self.pos.., 0);
        self.buf.truncate(len);
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use bstr::ByteSlice;

    use super::*;

    #[test]
    fn append_consume() {
        let mut buf = Buffer::new();
        assert!(buf.is_empty());

        buf.append(b"homer\nlisa");
        assert_eq!(buf.data().as_bstr(), "homer\nlisa");
        buf.consume(6);
        assert_eq!(buf.data().as_bstr(), "lisa");

        buf.append(b"\nmaggie");
        assert_eq!(buf.data().as_bstr(), "lisa\nmaggie");
        buf.consume(buf.len());
        assert!(buf.is_empty());
        assert_eq!(buf.data().as_bstr(), "");
    }

    #[test]
    fn lines() {
        let mut buf = Buffer::new();
        assert_eq!(buf.next_line(false), None);
        // Пустой буфер не выдаёт строк даже при сливе.
        assert_eq!(buf.next_line(true), None);

        buf.append(b"homer\nlisa\nmaggie");
        assert_eq!(buf.next_line(false), Some(6));
        buf.consume(6);
        assert_eq!(buf.next_line(false), Some(5));
        buf.consume(5);

        // Неполная строка ждёт терминатора, если слива нет.
        assert_eq!(buf.next_line(false), None);
        assert_eq!(buf.next_line(true), Some(6));
        buf.consume(6);
        assert!(buf.is_empty());
    }

    #[test]
    fn trim() {
        let mut buf = Buffer::new();
        buf.append(b"abcdefgh");
        buf.trim_to(3);
        assert_eq!(buf.data().as_bstr(), "fgh");
        // Лимит больше содержимого ничего не отбрасывает.
        buf.trim_to(100);
        assert_eq!(buf.data().as_bstr(), "fgh");
        buf.trim_to(0);
        assert!(buf.is_empty());
    }

    #[test]
    fn roll_keeps_remainder() {
        let mut buf = Buffer::new();
        buf.append(b"aaaa\nbb");
        buf.consume(5);
        buf.append(b"cc");
        assert_eq!(buf.data().as_bstr(), "bbcc");
        assert_eq!(buf.len(), 4);
    }
}
