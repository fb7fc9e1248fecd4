use crate::event::ports::PhysicsView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumFunc {
    Abs,
    Sqrt,
    Min,
    Max,
}

impl NumFunc {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Self::Abs),
            "sqrt" => Some(Self::Sqrt),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Abs | Self::Sqrt => 1,
            Self::Min | Self::Max => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumExpr {
    Literal(f64),
    Attribute(String),
    Neg(Box<NumExpr>),
    Binary {
        op: ArithOp,
        lhs: Box<NumExpr>,
        rhs: Box<NumExpr>,
    },
    Call {
        func: NumFunc,
        args: Vec<NumExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    Literal(bool),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Compare {
        op: CompareOp,
        lhs: NumExpr,
        rhs: NumExpr,
    },
    Has(String),
}

impl NumExpr {
    /// Missing attributes read as NaN.
    pub fn eval<V: PhysicsView + ?Sized>(&self, object: &V) -> f64 {
        match self {
            Self::Literal(value) => *value,
            Self::Attribute(name) => object.attribute(name).unwrap_or(f64::NAN),
            Self::Neg(inner) => -inner.eval(object),
            Self::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (lhs.eval(object), rhs.eval(object));
                match op {
                    ArithOp::Add => lhs + rhs,
                    ArithOp::Sub => lhs - rhs,
                    ArithOp::Mul => lhs * rhs,
                    ArithOp::Div => lhs / rhs,
                }
            }
            Self::Call { func, args } => {
                let first = args.first().map_or(f64::NAN, |arg| arg.eval(object));
                match func {
                    NumFunc::Abs => first.abs(),
                    NumFunc::Sqrt => first.sqrt(),
                    NumFunc::Min | NumFunc::Max => {
                        let second = args.get(1).map_or(f64::NAN, |arg| arg.eval(object));
                        if first.is_nan() || second.is_nan() {
                            f64::NAN
                        } else if matches!(func, NumFunc::Min) {
                            first.min(second)
                        } else {
                            first.max(second)
                        }
                    }
                }
            }
        }
    }
}

impl BoolExpr {
    pub fn eval<V: PhysicsView + ?Sized>(&self, object: &V) -> bool {
        match self {
            Self::Literal(value) => *value,
            Self::Not(inner) => !inner.eval(object),
            Self::And(lhs, rhs) => lhs.eval(object) && rhs.eval(object),
            Self::Or(lhs, rhs) => lhs.eval(object) || rhs.eval(object),
            Self::Compare { op, lhs, rhs } => {
                let (lhs, rhs) = (lhs.eval(object), rhs.eval(object));
                // NaN never satisfies a comparison, `!=` included.
                if lhs.is_nan() || rhs.is_nan() {
                    return false;
                }
                match op {
                    CompareOp::Lt => lhs < rhs,
                    CompareOp::Le => lhs <= rhs,
                    CompareOp::Gt => lhs > rhs,
                    CompareOp::Ge => lhs >= rhs,
                    CompareOp::Eq => lhs == rhs,
                    CompareOp::Ne => lhs != rhs,
                }
            }
            Self::Has(name) => object.attribute(name).is_some() || object.component(name).is_some(),
        }
    }
}
