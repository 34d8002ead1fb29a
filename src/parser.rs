use crate::ast::*;
use crate::error::{TemplateError, TemplateErrorKind};
use crate::lexer::{Spanned, Token, Tokenizer};

/// Parses template text into a node tree.
pub fn parse(input: &str, max_depth: usize) -> Result<Template, TemplateError> {
    Parser::new(input, max_depth).parse()
}

pub struct Parser<'a> {
    lexer: Tokenizer<'a>,
    depth: usize,
    max_depth: usize,
}

struct Attribute<'a> {
    name: &'a str,
    value: &'a str,
    /// Offset of the value in the template.
    offset: usize,
}

fn error(kind: TemplateErrorKind, offset: usize) -> TemplateError {
    TemplateError { kind, offset }
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, max_depth: usize) -> Self {
        Self {
            lexer: Tokenizer::new(input),
            depth: 0,
            max_depth,
        }
    }

    pub fn parse(&mut self) -> Result<Template, TemplateError> {
        let (nodes, end) = self.parse_nodes()?;
        match end {
            None => Ok(nodes),
            Some(stray) => Err(error(
                TemplateErrorKind::UnexpectedTag(stray.token.describe()),
                stray.offset,
            )),
        }
    }

    fn enter(&mut self, offset: usize) -> Result<(), TemplateError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(error(TemplateErrorKind::TooDeep, offset));
        }
        Ok(())
    }

    /// Parses nodes until EOF or a closing/branch tag, which is handed back
    /// to the caller unconsumed by any node.
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Option<Spanned<'a>>), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(spanned) = self.lexer.next_token()? {
            match spanned.token {
                Token::Text(s) => nodes.push(Node::Text(s.to_string())),
                Token::Var(src) => nodes.push(Node::Variable(parse_path(
                    src,
                    spanned.offset,
                    self.max_depth,
                )?)),
                Token::Math(src) => nodes.push(Node::Math(self.parse_inline(src, spanned.inner)?)),
                Token::Iif(attrs) => nodes.push(self.parse_iif(attrs, &spanned)?),
                Token::LoopOpen(attrs) => nodes.push(self.parse_loop(attrs, &spanned)?),
                Token::IfOpen(attrs) => nodes.push(self.parse_if(attrs, &spanned)?),
                Token::LoopClose | Token::ElseIf(_) | Token::Else(_) | Token::IfClose => {
                    return Ok((nodes, Some(spanned)));
                }
            }
        }
        Ok((nodes, None))
    }

    /// Attribute values and `math` bodies are mini-templates of brace tags.
    fn parse_inline(&mut self, src: &'a str, base: usize) -> Result<Vec<Node>, TemplateError> {
        self.enter(base)?;
        let mut nested = Parser {
            lexer: Tokenizer::inline(src, base),
            depth: self.depth,
            max_depth: self.max_depth,
        };
        let nodes = nested.parse()?;
        self.depth -= 1;
        Ok(nodes)
    }

    fn parse_iif(&mut self, attrs: &'a str, tag: &Spanned<'a>) -> Result<Node, TemplateError> {
        let mut case = None;
        let mut when_true = None;
        let mut when_false = None;
        for attr in parse_attributes(attrs, tag.inner)? {
            let nodes = self.parse_inline(attr.value, attr.offset)?;
            match attr.name {
                "case" => case = Some(nodes),
                "true" => when_true = Some(nodes),
                "false" => when_false = Some(nodes),
                other => {
                    return Err(error(
                        TemplateErrorKind::UnknownAttribute(other.to_string()),
                        tag.offset,
                    ))
                }
            }
        }
        let case =
            case.ok_or_else(|| error(TemplateErrorKind::MissingAttribute("case"), tag.offset))?;
        Ok(Node::InlineConditional {
            case,
            when_true,
            when_false,
        })
    }

    fn parse_loop(&mut self, attrs: &'a str, tag: &Spanned<'a>) -> Result<Node, TemplateError> {
        let mut set = None;
        let mut key = None;
        let mut value = None;
        for attr in parse_attributes(attrs, tag.inner)? {
            match attr.name {
                "set" => set = Some(parse_path(attr.value, tag.offset, self.max_depth)?),
                // `var` is the older spelling of `key`.
                "key" | "var" => key = Some(binding_name(&attr)?),
                "value" => value = Some(binding_name(&attr)?),
                other => {
                    return Err(error(
                        TemplateErrorKind::UnknownAttribute(other.to_string()),
                        tag.offset,
                    ))
                }
            }
        }
        let set = set.ok_or_else(|| error(TemplateErrorKind::MissingAttribute("set"), tag.offset))?;

        self.enter(tag.offset)?;
        let (body, end) = self.parse_nodes()?;
        self.depth -= 1;

        match end {
            Some(Spanned {
                token: Token::LoopClose,
                ..
            }) => Ok(Node::Loop {
                set,
                key,
                value,
                body,
            }),
            Some(other) => Err(error(
                TemplateErrorKind::UnexpectedTag(other.token.describe()),
                other.offset,
            )),
            None => Err(error(TemplateErrorKind::UnclosedBlock("loop"), tag.offset)),
        }
    }

    fn parse_if(&mut self, attrs: &'a str, tag: &Spanned<'a>) -> Result<Node, TemplateError> {
        let case = self
            .branch_case(attrs, tag)?
            .ok_or_else(|| error(TemplateErrorKind::MissingAttribute("case"), tag.offset))?;

        let mut branches = Vec::new();
        let mut else_body = None;
        // `None` once the else branch has started.
        let mut pending = Some(case);

        self.enter(tag.offset)?;
        loop {
            let (body, end) = self.parse_nodes()?;
            match pending.take() {
                Some(case) => branches.push((case, body)),
                None => else_body = Some(body),
            }
            let Some(end) = end else {
                return Err(error(TemplateErrorKind::UnclosedBlock("if"), tag.offset));
            };
            match end.token {
                Token::IfClose => break,
                Token::ElseIf(attrs) if else_body.is_none() => {
                    pending = self.branch_case(attrs, &end)?;
                }
                Token::Else(attrs) if else_body.is_none() => {
                    if let Some(attr) = parse_attributes(attrs, end.inner)?.first() {
                        return Err(error(
                            TemplateErrorKind::UnknownAttribute(attr.name.to_string()),
                            end.offset,
                        ));
                    }
                }
                other => {
                    return Err(error(
                        TemplateErrorKind::UnexpectedTag(other.describe()),
                        end.offset,
                    ))
                }
            }
        }
        self.depth -= 1;

        Ok(Node::Conditional {
            branches,
            else_body,
        })
    }

    /// The `case` of an `<if>` / `<elseif>` tag; `None` for a bare branch.
    fn branch_case(
        &mut self,
        attrs: &'a str,
        tag: &Spanned<'a>,
    ) -> Result<Option<Vec<Node>>, TemplateError> {
        let mut case = None;
        for attr in parse_attributes(attrs, tag.inner)? {
            match attr.name {
                "case" => case = Some(self.parse_inline(attr.value, attr.offset)?),
                other => {
                    return Err(error(
                        TemplateErrorKind::UnknownAttribute(other.to_string()),
                        tag.offset,
                    ))
                }
            }
        }
        Ok(case)
    }
}

fn binding_name(attr: &Attribute<'_>) -> Result<String, TemplateError> {
    let name = attr.value.trim();
    if name.is_empty() {
        return Err(error(TemplateErrorKind::MalformedAttribute, attr.offset));
    }
    Ok(name.to_string())
}

/// `name="value" name='value' ...`. Values may contain nested brace tags
/// with their own quotes.
fn parse_attributes(src: &str, base: usize) -> Result<Vec<Attribute<'_>>, TemplateError> {
    let bytes = src.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;
    let malformed = |at: usize| error(TemplateErrorKind::MalformedAttribute, base + at);

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Ok(attrs);
        }

        let name_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'_' | b'-')) {
            pos += 1;
        }
        if pos == name_start {
            return Err(malformed(pos));
        }
        let name = &src[name_start..pos];

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(malformed(pos));
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(q @ (b'"' | b'\'')) => *q,
            _ => return Err(malformed(pos)),
        };
        let value_start = pos + 1;
        let mut depth = 0usize;
        let mut end = None;
        for (i, &b) in bytes[value_start..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                _ if b == quote && depth == 0 => {
                    end = Some(value_start + i);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| malformed(pos))?;
        attrs.push(Attribute {
            name,
            value: &src[value_start..end],
            offset: base + value_start,
        });
        pos = end + 1;
    }
}

/// Parses `name(.name | [inner])*`. A bracket holding a quoted string is a
/// literal key; anything else is a nested path resolved at render time.
/// Brackets may nest at most `max_depth` levels.
pub fn parse_path(src: &str, offset: usize, max_depth: usize) -> Result<Path, TemplateError> {
    parse_path_at(src, offset, 0, max_depth)
}

fn parse_path_at(
    src: &str,
    offset: usize,
    depth: usize,
    max_depth: usize,
) -> Result<Path, TemplateError> {
    if depth > max_depth {
        return Err(error(TemplateErrorKind::TooDeep, offset));
    }
    let raw = src.trim();
    let invalid = || error(TemplateErrorKind::InvalidPath(raw.to_string()), offset);
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => {
                let mut depth = 0usize;
                let mut close = None;
                for (i, &b) in bytes[pos..].iter().enumerate() {
                    match b {
                        b'[' => depth += 1,
                        b']' => {
                            depth -= 1;
                            if depth == 0 {
                                close = Some(pos + i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let close = close.ok_or_else(invalid)?;
                let inner = raw[pos + 1..close].trim();
                let quoted = inner.len() >= 2
                    && ((inner.starts_with('\'') && inner.ends_with('\''))
                        || (inner.starts_with('"') && inner.ends_with('"')));
                if quoted {
                    segments.push(Segment::Key(inner[1..inner.len() - 1].to_string()));
                } else if inner.is_empty() {
                    return Err(invalid());
                } else {
                    segments.push(Segment::Computed(parse_path_at(
                        inner,
                        offset,
                        depth + 1,
                        max_depth,
                    )?));
                }
                pos = close + 1;
            }
            b']' => return Err(invalid()),
            b'.' if segments.is_empty() => return Err(invalid()),
            // A name glued to a closing bracket, as in `a[b]c`.
            b if b != b'.' && !segments.is_empty() => return Err(invalid()),
            _ => {
                if bytes[pos] == b'.' {
                    pos += 1;
                }
                let start = pos;
                while pos < bytes.len() && !matches!(bytes[pos], b'.' | b'[' | b']') {
                    pos += 1;
                }
                let name = raw[start..pos].trim();
                if name.is_empty() {
                    return Err(invalid());
                }
                segments.push(Segment::Key(name.to_string()));
            }
        }
    }

    if segments.is_empty() {
        return Err(invalid());
    }
    Ok(Path {
        segments,
        raw: raw.to_string(),
    })
}
