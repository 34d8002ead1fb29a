use crate::ast::*;
use crate::expr;
use crate::value::Value;
use std::borrow::Cow;
use tracing::debug;

/// Names bound by one loop iteration.
struct Frame<'t, 'd> {
    key: Option<(&'t str, Value)>,
    value: Option<(&'t str, Cow<'d, Value>)>,
}

impl<'t, 'd> Frame<'t, 'd> {
    fn lookup(&self, name: &str) -> Option<Cow<'d, Value>> {
        if let Some((bound, value)) = &self.value {
            if *bound == name {
                return Some(value.clone());
            }
        }
        match &self.key {
            Some((bound, key)) if *bound == name => Some(Cow::Owned(key.clone())),
            _ => None,
        }
    }
}

/// Walks a node tree against one data document.
///
/// Unresolved references and expression failures never abort rendering;
/// they produce empty output and a `debug` event.
pub struct Renderer<'t, 'd> {
    root: &'d Value,
    scopes: Vec<Frame<'t, 'd>>,
    max_depth: usize,
}

impl<'t, 'd> Renderer<'t, 'd> {
    pub fn new(root: &'d Value, max_depth: usize) -> Self {
        Self {
            root,
            scopes: Vec::new(),
            max_depth,
        }
    }

    pub fn render(&mut self, template: &'t [Node]) -> String {
        let mut output = String::new();
        self.render_into(template, &mut output);
        output
    }

    fn render_into(&mut self, nodes: &'t [Node], output: &mut String) {
        for node in nodes {
            match node {
                Node::Text(s) => output.push_str(s),
                Node::Variable(path) => match self.resolve(path) {
                    Some(value) => match value.as_text() {
                        Some(text) => output.push_str(&text),
                        None => debug!(
                            path = %path.raw,
                            kind = value.type_name(),
                            "container value cannot be substituted"
                        ),
                    },
                    None => debug!(path = %path.raw, "unresolved reference"),
                },
                Node::Math(body) => {
                    let src = self.render(body);
                    match expr::evaluate(&src, self.max_depth) {
                        Ok(result) => output.push_str(&result.render()),
                        Err(error) => debug!(expression = %src, %error, "math evaluation failed"),
                    }
                }
                Node::InlineConditional {
                    case,
                    when_true,
                    when_false,
                } => {
                    let branch = if self.test(case) { when_true } else { when_false };
                    if let Some(branch) = branch {
                        self.render_into(branch, output);
                    }
                }
                Node::Loop {
                    set,
                    key,
                    value,
                    body,
                } => self.render_loop(set, key.as_deref(), value.as_deref(), body, output),
                Node::Conditional {
                    branches,
                    else_body,
                } => {
                    let mut chosen = else_body.as_ref();
                    for (case, body) in branches {
                        if self.test(case) {
                            chosen = Some(body);
                            break;
                        }
                    }
                    if let Some(body) = chosen {
                        self.render_into(body, output);
                    }
                }
            }
        }
    }

    fn render_loop(
        &mut self,
        set: &'t Path,
        key: Option<&'t str>,
        value: Option<&'t str>,
        body: &'t [Node],
        output: &mut String,
    ) {
        let Some(source) = self.resolve(set) else {
            debug!(path = %set.raw, "unresolved loop set");
            return;
        };
        let kind = source.type_name();
        let Some(members) = members(source) else {
            debug!(path = %set.raw, kind, "loop set is not an array or object");
            return;
        };

        for (member_key, member) in members {
            self.scopes.push(Frame {
                key: key.map(|name| (name, Value::String(member_key))),
                value: value.map(|name| (name, member)),
            });
            self.render_into(body, output);
            self.scopes.pop();
        }
    }

    /// Evaluates a `case` mini-template; errors count as false.
    fn test(&mut self, case: &'t [Node]) -> bool {
        let src = self.render(case);
        if src.trim().is_empty() {
            return false;
        }
        match expr::evaluate(&src, self.max_depth) {
            Ok(result) => result.is_truthy(),
            Err(error) => {
                debug!(expression = %src, %error, "case evaluation failed");
                false
            }
        }
    }

    fn lookup_scope(&self, name: &str) -> Option<Cow<'d, Value>> {
        self.scopes.iter().rev().find_map(|frame| frame.lookup(name))
    }

    /// The head segment is looked up innermost-first in the loop scope,
    /// then in the root document; later segments descend from there.
    pub fn resolve(&self, path: &Path) -> Option<Cow<'d, Value>> {
        let (head, rest) = path.segments.split_first()?;
        let mut current = match head {
            Segment::Key(name) => match self.lookup_scope(name) {
                Some(bound) => bound,
                None => Cow::Borrowed(self.root.get_segment(name)?),
            },
            Segment::Computed(_) => {
                let key = self.segment_key(head)?;
                Cow::Borrowed(self.root.get_segment(&key)?)
            }
        };
        for segment in rest {
            let key = self.segment_key(segment)?;
            current = descend(current, &key)?;
        }
        Some(current)
    }

    /// `[name]` is a loop binding when one is in scope, else the literal
    /// key. Longer bracket paths resolve fully and fall back to their text.
    fn segment_key(&self, segment: &Segment) -> Option<String> {
        match segment {
            Segment::Key(name) => Some(name.clone()),
            Segment::Computed(inner) => {
                let resolved = match inner.as_name() {
                    Some(name) => self.lookup_scope(name),
                    None => self.resolve(inner),
                };
                match resolved {
                    Some(value) => value.as_text().map(Cow::into_owned),
                    None => Some(inner.raw.clone()),
                }
            }
        }
    }
}

fn descend<'d>(current: Cow<'d, Value>, key: &str) -> Option<Cow<'d, Value>> {
    match current {
        Cow::Borrowed(value) => value.get_segment(key).map(Cow::Borrowed),
        Cow::Owned(value) => value.get_segment(key).cloned().map(Cow::Owned),
    }
}

/// Iteration order: array index order, or object insertion order.
fn members<'d>(value: Cow<'d, Value>) -> Option<Vec<(String, Cow<'d, Value>)>> {
    match value {
        Cow::Borrowed(Value::Array(items)) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), Cow::Borrowed(item)))
                .collect(),
        ),
        Cow::Borrowed(Value::Object(map)) => Some(
            map.iter()
                .map(|(k, item)| (k.clone(), Cow::Borrowed(item)))
                .collect(),
        ),
        Cow::Owned(Value::Array(items)) => Some(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), Cow::Owned(item)))
                .collect(),
        ),
        Cow::Owned(Value::Object(map)) => Some(
            map.into_iter()
                .map(|(k, item)| (k, Cow::Owned(item)))
                .collect(),
        ),
        _ => None,
    }
}
