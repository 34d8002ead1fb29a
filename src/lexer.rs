use crate::error::{TemplateError, TemplateErrorKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Text(&'a str),

    // Brace tags; the payload is the text between opener and closing `}`.
    Var(&'a str),  // {v:...}
    Math(&'a str), // {math:...}
    Iif(&'a str),  // {iif ...}

    // Block tags; the payload is the attribute text.
    LoopOpen(&'a str), // <loop ...>
    LoopClose,         // </loop>
    IfOpen(&'a str),   // <if ...>
    ElseIf(&'a str),   // <elseif ... />
    Else(&'a str),     // <else />
    IfClose,           // </if>
}

impl Token<'_> {
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Text(_) => "text",
            Token::Var(_) => "{v:",
            Token::Math(_) => "{math:",
            Token::Iif(_) => "{iif",
            Token::LoopOpen(_) => "<loop>",
            Token::LoopClose => "</loop>",
            Token::IfOpen(_) => "<if>",
            Token::ElseIf(_) => "<elseif />",
            Token::Else(_) => "<else />",
            Token::IfClose => "</if>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    /// Offset of the tag opener (or text start).
    pub offset: usize,
    /// Offset of the payload.
    pub inner: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Opener {
    Var,
    Math,
    Iif,
    LoopOpen,
    LoopClose,
    IfOpen,
    ElseIf,
    Else,
    IfClose,
}

impl Opener {
    fn literal(self) -> &'static str {
        match self {
            Opener::Var => "{v:",
            Opener::Math => "{math:",
            Opener::Iif => "{iif",
            Opener::LoopOpen => "<loop",
            Opener::LoopClose => "</loop>",
            Opener::IfOpen => "<if",
            Opener::ElseIf => "<elseif",
            Opener::Else => "<else",
            Opener::IfClose => "</if>",
        }
    }
}

/// Splits template text into literal spans and tags.
///
/// Only the openers listed in [`Token`] start a tag; any other `{` or `<`
/// is literal text. Inline mode (used for attribute values and expression
/// bodies) recognises brace tags only, so `<` stays a comparison operator.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
    base: usize,
    block_tags: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            base: 0,
            block_tags: true,
        }
    }

    /// Tokenizer for a nested mini-template located at `base` in the
    /// enclosing source.
    pub fn inline(input: &'a str, base: usize) -> Self {
        Self {
            input,
            cursor: 0,
            base,
            block_tags: false,
        }
    }

    fn opener_at(&self, pos: usize) -> Option<Opener> {
        let rest = &self.input[pos..];
        let followed_by = |len: usize, extra: &[u8]| match rest.as_bytes().get(len) {
            Some(b) => b.is_ascii_whitespace() || extra.contains(b),
            None => false,
        };

        if rest.starts_with("{v:") {
            return Some(Opener::Var);
        }
        if rest.starts_with("{math:") {
            return Some(Opener::Math);
        }
        if rest.starts_with("{iif") && followed_by(4, b"}") {
            return Some(Opener::Iif);
        }
        if !self.block_tags || !rest.starts_with('<') {
            return None;
        }
        if rest.starts_with("</loop>") {
            Some(Opener::LoopClose)
        } else if rest.starts_with("</if>") {
            Some(Opener::IfClose)
        } else if rest.starts_with("<loop") && followed_by(5, b">") {
            Some(Opener::LoopOpen)
        } else if rest.starts_with("<elseif") && followed_by(7, b"/>") {
            Some(Opener::ElseIf)
        } else if rest.starts_with("<else") && followed_by(5, b"/>") {
            Some(Opener::Else)
        } else if rest.starts_with("<if") && followed_by(3, b">") {
            Some(Opener::IfOpen)
        } else {
            None
        }
    }

    /// Finds `closer` at brace depth zero. With `quoted`, closers inside
    /// attribute quotes are skipped as well.
    fn find_close(&self, from: usize, closer: u8, quoted: bool) -> Option<usize> {
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        for (i, &b) in self.input.as_bytes()[from..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'"' | b'\'' if quoted && depth == 0 => match quote {
                    None => quote = Some(b),
                    Some(q) if q == b => quote = None,
                    Some(_) => {}
                },
                _ if b == closer && depth == 0 && quote.is_none() => return Some(from + i),
                _ => {}
            }
        }
        None
    }

    pub fn next_token(&mut self) -> Result<Option<Spanned<'a>>, TemplateError> {
        let start = self.cursor;
        if start >= self.input.len() {
            return Ok(None);
        }

        let Some(opener) = self.opener_at(start) else {
            // Text up to the next recognised opener.
            let bytes = self.input.as_bytes();
            let mut end = start + 1;
            while end < bytes.len() {
                if matches!(bytes[end], b'{' | b'<') && self.opener_at(end).is_some() {
                    break;
                }
                end += 1;
            }
            self.cursor = end;
            return Ok(Some(Spanned {
                token: Token::Text(&self.input[start..end]),
                offset: self.base + start,
                inner: self.base + start,
            }));
        };

        let inner = start + opener.literal().len();
        let token = match opener {
            Opener::LoopClose => {
                self.cursor = inner;
                Token::LoopClose
            }
            Opener::IfClose => {
                self.cursor = inner;
                Token::IfClose
            }
            Opener::Var | Opener::Math | Opener::Iif => {
                let end = self
                    .find_close(inner, b'}', opener == Opener::Iif)
                    .ok_or_else(|| self.unclosed(opener, start))?;
                self.cursor = end + 1;
                let payload = &self.input[inner..end];
                match opener {
                    Opener::Var => Token::Var(payload),
                    Opener::Math => Token::Math(payload),
                    _ => Token::Iif(payload),
                }
            }
            Opener::LoopOpen | Opener::IfOpen | Opener::ElseIf | Opener::Else => {
                let end = self
                    .find_close(inner, b'>', true)
                    .ok_or_else(|| self.unclosed(opener, start))?;
                self.cursor = end + 1;
                let payload = &self.input[inner..end];
                match opener {
                    Opener::LoopOpen => Token::LoopOpen(payload),
                    Opener::IfOpen => Token::IfOpen(payload),
                    Opener::ElseIf => Token::ElseIf(strip_self_closing(payload)),
                    _ => Token::Else(strip_self_closing(payload)),
                }
            }
        };

        Ok(Some(Spanned {
            token,
            offset: self.base + start,
            inner: self.base + inner,
        }))
    }

    fn unclosed(&self, opener: Opener, start: usize) -> TemplateError {
        TemplateError {
            kind: TemplateErrorKind::UnclosedTag(opener.literal()),
            offset: self.base + start,
        }
    }
}

fn strip_self_closing(payload: &str) -> &str {
    let trimmed = payload.trim_end();
    trimmed.strip_suffix('/').unwrap_or(trimmed)
}
