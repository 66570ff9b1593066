//! Syntax tree of a state script.

/// A parsed script: statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// One statement with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `name = expr`
    Assign { target: String, value: Expr },
    /// A bare expression, evaluated for its side effects.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// `base.name`, also produced by `base["name"]`.
    Attr { base: Box<Expr>, name: String },
    Call { callee: Box<Expr>, args: Vec<CallArg> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Positional(Expr),
    Keyword(String, Expr),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(value.into()))
    }

    pub fn name(value: impl Into<String>) -> Self {
        Expr::Name(value.into())
    }

    #[must_use]
    pub fn attr(self, name: impl Into<String>) -> Self {
        Expr::Attr {
            base: Box::new(self),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn call(self, args: Vec<CallArg>) -> Self {
        Expr::Call {
            callee: Box::new(self),
            args,
        }
    }
}
