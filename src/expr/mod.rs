//! 受限的条件/映射表达式.
//!
//! 只支持字面量、消息字段访问、算术、比较和逻辑运算, 不支持函数调用、
//! 赋值或任何脚本能力. 过滤节点的条件和转换节点的字段映射都由这里求值.
//!
//! 字段路径可带 `msg.` 前缀 (`msg.temperature` 与 `temperature` 等价),
//! 不存在的字段求值为 `null`.

mod lexer;
mod parser;

pub use lexer::{Lexer, Token};
pub use parser::Parser;

use serde_json::{Number, Value};
use thiserror::Error;

/// 默认的表达式最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("第 {position} 个字符处无法识别: '{found}'")]
    UnexpectedChar { position: usize, found: char },

    #[error("字符串未闭合, 起始于第 {0} 个字符")]
    UnterminatedString(usize),

    #[error("无效的数字: {0}")]
    InvalidNumber(String),

    #[error("语法错误: 期望 {expected}, 实际为 {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("表达式为空")]
    Empty,

    #[error("表达式嵌套超过 {0} 层")]
    TooDeep(usize),

    #[error("类型错误: {0}")]
    Type(String),

    #[error("除数为零")]
    DivisionByZero,

    #[error("计算结果不是有限数值")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(Vec<String>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// 解析表达式文本
pub fn compile(source: &str, max_depth: usize) -> Result<Expr, ExprError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens, max_depth).parse()
}

/// 以消息数据为上下文求值
pub fn evaluate(expr: &Expr, data: &Value) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(path) => Ok(lookup(data, path).cloned().unwrap_or(Value::Null)),
        Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!truthy(&evaluate(operand, data)?))),
        Expr::Unary(UnaryOp::Neg, operand) => match evaluate(operand, data)? {
            Value::Number(n) => number(-n.as_f64().unwrap_or_default()),
            other => Err(ExprError::Type(format!("无法对 {} 取负", other))),
        },
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !truthy(&evaluate(lhs, data)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&evaluate(rhs, data)?)))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if truthy(&evaluate(lhs, data)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&evaluate(rhs, data)?)))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, data)?;
            let rhs = evaluate(rhs, data)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

/// 求值并按真值规则转换为布尔值
pub fn evaluate_bool(expr: &Expr, data: &Value) -> Result<bool, ExprError> {
    evaluate(expr, data).map(|v| truthy(&v))
}

/// 真值规则: null、false、0、空字符串为假, 其余为真
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lookup<'v>(data: &'v Value, path: &[String]) -> Option<&'v Value> {
    let path = match path.split_first() {
        Some((first, rest)) if first == "msg" && data.get("msg").is_none() => rest,
        _ => path,
    };
    path.iter().try_fold(data, |current, segment| current.get(segment))
}

/// 将计算结果转换为 JSON 数值, 整数值保持为整数
pub(crate) fn number(f: f64) -> Result<Value, ExprError> {
    if !f.is_finite() {
        return Err(ExprError::NonFinite);
    }
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return Ok(Value::from(f as i64));
    }
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or(ExprError::NonFinite)
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => {
                number(a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default())
            }
            (Value::String(a), other) => Ok(Value::String(format!("{}{}", a, display(other)))),
            (other, Value::String(b)) => Ok(Value::String(format!("{}{}", display(other), b))),
            _ => Err(ExprError::Type(format!("无法计算 {} + {}", lhs, rhs))),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Err(ExprError::Type(format!(
                    "算术运算需要数值, 实际为 {} 和 {}",
                    lhs, rhs
                )));
            };
            match op {
                BinaryOp::Sub => number(a - b),
                BinaryOp::Mul => number(a * b),
                _ if b == 0.0 => Err(ExprError::DivisionByZero),
                BinaryOp::Div => number(a / b),
                _ => number(a % b),
            }
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("逻辑运算在 evaluate 中短路处理"),
    }
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
