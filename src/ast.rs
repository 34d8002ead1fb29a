/// One step of a variable path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `name` or `.name`, or a quoted bracket key `['name']`.
    Key(String),
    /// `[inner]`: resolved against the loop scope before being used as a key.
    Computed(Path),
}

/// `major[_m_][_i_].Name`
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
    /// Source text, used as the literal key when a computed bracket does
    /// not resolve.
    pub raw: String,
}

impl Path {
    /// The single bare name this path consists of, if any.
    pub fn as_name(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [Segment::Key(name)] => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// Parsed `math` / `case` expression, after tag substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{v:path}`
    Variable(Path),
    /// `{math: expr}`; the body may itself contain tags.
    Math(Vec<Node>),
    /// `{iif case="..." true="..." false="..."}`
    InlineConditional {
        case: Vec<Node>,
        when_true: Option<Vec<Node>>,
        when_false: Option<Vec<Node>>,
    },
    /// `<loop set="path" key="k" value="v"> ... </loop>`
    Loop {
        set: Path,
        key: Option<String>,
        value: Option<String>,
        body: Vec<Node>,
    },
    /// `<if case="..."> ... <elseif case="..." /> ... <else /> ... </if>`
    Conditional {
        branches: Vec<(Vec<Node>, Vec<Node>)>, // (case, body) in source order
        else_body: Option<Vec<Node>>,
    },
}

pub type Template = Vec<Node>;
