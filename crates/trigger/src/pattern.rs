/*!
Скомпилированный шаблон триггера и его классификация.

Шаблон компилируется один раз при создании триггера. Тогда же, по
разобранной структуре выражения, выводится признак `spans_lines`:
может ли совпадение пересечь границу строки. Флаги, заданные внутри
подвыражений, учитываются автоматически, потому что анализ идёт по
HIR, в котором флаги уже применены.
*/

use regex_syntax::hir::{self, Class, Hir, HirKind};

use crate::{buffer::LINE_TERM, error::Error};

/// Скомпилированное регулярное выражение одного триггера.
///
/// Значение неизменяемо и живёт столько же, сколько его триггер.
#[derive(Clone, Debug)]
pub struct Pattern {
    re: regex::bytes::Regex,
    spans_lines: bool,
}

impl Pattern {
    /// Скомпилировать шаблон.
    ///
    /// Некорректное выражение — это ошибка конфигурации: триггер с таким
    /// шаблоном не создаётся.
    pub fn new(pattern: &str) -> Result<Pattern, Error> {
        let hir = regex_syntax::ParserBuilder::new()
            .utf8(false)
            .build()
            .parse(pattern)
            .map_err(Error::regex)?;
        let re = regex::bytes::Regex::new(pattern).map_err(Error::regex)?;
        Ok(Pattern { re, spans_lines: can_match_byte(&hir, LINE_TERM) })
    }

    /// Возвращает true тогда и только тогда, когда совпадение этого шаблона
    /// может пересечь границу строки.
    ///
    /// Такие шаблоны ищутся по всему накопленному буферу, а не построчно.
    pub fn spans_lines(&self) -> bool {
        self.spans_lines
    }

    /// Исходный текст шаблона.
    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }

    /// Найти первое совпадение шаблона в данной области байтов вместе с
    /// подвыражениями.
    pub(crate) fn captures<'h>(
        &self,
        haystack: &'h [u8],
    ) -> Option<regex::bytes::Captures<'h>> {
        self.re.captures(haystack)
    }
}

/// Возвращает true, если какая-либо часть выражения может совпасть с
/// данным байтом.
///
/// Утверждения нулевой ширины (`^`, `$`, `\b`, ...) не совпадают ни с
/// одним байтом и потому не делают шаблон многострочным, даже при
/// включённом флаге `m`.
fn can_match_byte(hir: &Hir, byte: u8) -> bool {
    match *hir.kind() {
        HirKind::Empty | HirKind::Look(_) => false,
        HirKind::Literal(hir::Literal(ref bytes)) => bytes.contains(&byte),
        HirKind::Class(Class::Unicode(ref cls)) => {
            let ch = char::from(byte);
            cls.ranges().iter().any(|r| r.start() <= ch && ch <= r.end())
        }
        HirKind::Class(Class::Bytes(ref cls)) => {
            cls.ranges().iter().any(|r| r.start() <= byte && byte <= r.end())
        }
        HirKind::Repetition(ref rep) => can_match_byte(&rep.sub, byte),
        HirKind::Capture(ref cap) => can_match_byte(&cap.sub, byte),
        HirKind::Concat(ref subs) | HirKind::Alternation(ref subs) => {
            subs.iter().any(|sub| can_match_byte(sub, byte))
        }
    }
}
