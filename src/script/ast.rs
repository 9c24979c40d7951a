//! Syntax tree for block scripts

/// The closed set of operations a script may invoke on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    CreateBall,
    SetBallPosition,
    SetBallRadius,
    DropBall,
    Print,
    SetGravity,
}

impl HostOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "createBall" => Some(HostOp::CreateBall),
            "setBallPosition" => Some(HostOp::SetBallPosition),
            "setBallRadius" => Some(HostOp::SetBallRadius),
            "dropBall" => Some(HostOp::DropBall),
            "print" => Some(HostOp::Print),
            "setGravity" => Some(HostOp::SetGravity),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostOp::CreateBall => "createBall",
            HostOp::SetBallPosition => "setBallPosition",
            HostOp::SetBallRadius => "setBallRadius",
            HostOp::DropBall => "dropBall",
            HostOp::Print => "print",
            HostOp::SetGravity => "setGravity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Undefined,
    Null,
    Ident { name: String, pos: usize },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call(HostCall),
}

/// `api.<op>(args...)`
#[derive(Debug, Clone, PartialEq)]
pub struct HostCall {
    pub op: HostOp,
    pub args: Vec<Expr>,
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var a = 1, b;`
    Var(Vec<(String, Option<Expr>)>),
    Assign { name: String, op: AssignOp, value: Expr },
    /// `name++` / `name--`
    Step { name: String, delta: f64 },
    Expr(Expr),
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Empty,
}

/// A parsed script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(|s| matches!(s, Stmt::Empty))
    }
}
