//! Delimiter balance check run before a harness is generated
//!
//! This is not a parser. It catches code that would break the surrounding
//! template (an unclosed brace swallowing the harness body, a string running
//! off the end) without invoking the sandbox. String literals and comments
//! are skipped so delimiters inside them are ignored.

use crate::config::CommentSyntax;
use crate::harness::HarnessError;

struct Scanner<'a> {
    code: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(code: &'a str) -> Self {
        Self { code, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.code[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, s: &str) -> bool {
        if !s.is_empty() && self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn line_at(&self, pos: usize) -> usize {
        self.code[..pos].matches('\n').count() + 1
    }

    fn skip_line(&mut self) {
        match self.rest().find('\n') {
            Some(offset) => self.pos += offset,
            None => self.pos = self.code.len(),
        }
    }

    fn skip_past(&mut self, terminator: &str) -> bool {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                true
            }
            None => false,
        }
    }

    /// Skip a string literal starting at the current position.
    fn skip_string(&mut self, quote: char) -> Result<(), HarnessError> {
        let start = self.pos;
        let code = self.code;
        let unterminated = move || HarnessError::UnterminatedString {
            line: code[..start].matches('\n').count() + 1,
        };

        // C# verbatim strings: no backslash escapes, `""` is a quote, may span lines
        let verbatim = quote == '"' && self.code[..start].ends_with('@');

        if quote != '`' {
            let triple: String = std::iter::repeat_n(quote, 3).collect();
            if self.eat(&triple) {
                loop {
                    if self.eat(&triple) {
                        return Ok(());
                    }
                    match self.bump() {
                        None => return Err(unterminated()),
                        Some('\\') => {
                            self.bump();
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        self.bump();
        loop {
            match self.bump() {
                None => return Err(unterminated()),
                Some('\\') if !verbatim => {
                    if self.bump().is_none() {
                        return Err(unterminated());
                    }
                }
                Some(c) if c == quote => {
                    if verbatim && self.peek() == Some(quote) {
                        self.bump();
                        continue;
                    }
                    return Ok(());
                }
                Some('\n') if quote != '`' && !verbatim => return Err(unterminated()),
                Some(_) => {}
            }
        }
    }
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Check that `()`, `[]` and `{}` in `code` are balanced and properly nested.
pub fn check_balanced(code: &str, comments: &CommentSyntax) -> Result<(), HarnessError> {
    let mut scanner = Scanner::new(code);
    let mut stack: Vec<(char, usize)> = Vec::new();

    while let Some(c) = scanner.peek() {
        let start = scanner.pos;

        if let Some(prefix) = comments.line.as_deref()
            && scanner.eat(prefix)
        {
            scanner.skip_line();
            continue;
        }

        if let Some(block) = comments.block.as_ref()
            && scanner.eat(&block.open)
        {
            if !scanner.skip_past(&block.close) {
                return Err(HarnessError::UnterminatedComment {
                    line: scanner.line_at(start),
                });
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => scanner.skip_string(c)?,
            '(' | '[' | '{' => {
                stack.push((c, start));
                scanner.bump();
            }
            ')' | ']' | '}' => {
                match stack.pop() {
                    Some((open, _)) if closing(open) == c => {}
                    Some((open, _)) => {
                        return Err(HarnessError::Mismatched {
                            expected: closing(open),
                            found: c,
                            line: scanner.line_at(start),
                        });
                    }
                    None => {
                        return Err(HarnessError::Unbalanced {
                            found: c,
                            line: scanner.line_at(start),
                        });
                    }
                }
                scanner.bump();
            }
            _ => {
                scanner.bump();
            }
        }
    }

    match stack.pop() {
        Some((open, pos)) => Err(HarnessError::Unclosed {
            delimiter: open,
            line: scanner.line_at(pos),
        }),
        None => Ok(()),
    }
}
