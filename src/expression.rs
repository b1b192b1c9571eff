//! A small expression language for the scale and bbox settings.
//!
//! Supported: numeric and `'string'` literals, `NULL`, column references
//! (bare `name` or `"quoted name"`), `+ - * / %`, unary minus, string
//! concatenation with `||` and parentheses. Column values come from the
//! extra data fetched alongside every search result.
//!
//! ```text
//! "xmin" || ',' || "ymin" || ',' || "xmax" || ',' || "ymax"
//! 500 * "rank" + 1000
//! ```

use chumsky::prelude::*;

use crate::models::{ExtraData, FieldValue};

type ParseError<'src> = extra::Err<Rich<'src, char>>;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(FieldValue),
    Column(String),
    Negate(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
}

/// A parsed expression. Parsing happens once when the configuration is
/// loaded; evaluation happens per selected row.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, String> {
        if source.trim().is_empty() {
            return Err("expression is empty".to_string());
        }
        let root = parser().parse(source).into_result().map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        })?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Column names in order of first reference, each listed once.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        collect_columns(&self.root, &mut columns);
        columns
    }

    pub fn evaluate(&self, data: &ExtraData) -> Result<FieldValue, String> {
        eval(&self.root, data)
    }
}

fn collect_columns(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Literal(_) => {}
        Node::Column(name) => {
            if !out.iter().any(|c| c == name) {
                out.push(name.clone());
            }
        }
        Node::Negate(inner) => collect_columns(inner, out),
        Node::Binary(_, lhs, rhs) => {
            collect_columns(lhs, out);
            collect_columns(rhs, out);
        }
    }
}

fn op<'src>(c: char) -> impl Parser<'src, &'src str, char, ParseError<'src>> + Clone {
    just(c).padded()
}

/// A quoted run; a doubled quote stands for itself.
fn quoted<'src>(quote: char) -> impl Parser<'src, &'src str, String, ParseError<'src>> + Clone {
    none_of(quote)
        .or(just(quote).ignore_then(just(quote)))
        .repeated()
        .collect::<String>()
        .delimited_by(just(quote), just(quote))
}

fn number<'src>() -> impl Parser<'src, &'src str, FieldValue, ParseError<'src>> + Clone {
    let mantissa = text::digits(10)
        .then(just('.').then(text::digits(10).or_not()).or_not())
        .ignored()
        .or(just('.').then(text::digits(10)).ignored());
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(text::digits(10));

    mantissa
        .then(exponent.or_not())
        .to_slice()
        .try_map(|raw: &str, span| {
            let is_integer = !raw.contains(['.', 'e', 'E']);
            if let Some(i) = is_integer.then(|| raw.parse::<i64>().ok()).flatten() {
                return Ok(FieldValue::Integer(i));
            }
            raw.parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|e| Rich::custom(span, format!("bad number '{}': {}", raw, e)))
        })
}

/// Precedence, loosest first: `||`, then `+ -`, then `* / %`, then unary
/// minus.
fn parser<'src>() -> impl Parser<'src, &'src str, Node, ParseError<'src>> {
    let expr = recursive(|expr| {
        let column = text::ascii::ident().map(|name: &str| {
            if name.eq_ignore_ascii_case("null") {
                Node::Literal(FieldValue::Null)
            } else {
                Node::Column(name.to_string())
            }
        });

        let atom = choice((
            number().map(Node::Literal),
            quoted('\'').map(|s| Node::Literal(FieldValue::Text(s))),
            quoted('"').map(Node::Column),
            column,
            expr.delimited_by(op('('), op(')')),
        ))
        .padded();

        let unary = op('-')
            .repeated()
            .foldr(atom, |_, rhs| Node::Negate(Box::new(rhs)));

        let term = unary.clone().foldl(
            choice((
                op('*').to(BinaryOp::Mul),
                op('/').to(BinaryOp::Div),
                op('%').to(BinaryOp::Rem),
            ))
            .then(unary)
            .repeated(),
            |lhs, (kind, rhs)| Node::Binary(kind, Box::new(lhs), Box::new(rhs)),
        );

        let additive = term.clone().foldl(
            choice((op('+').to(BinaryOp::Add), op('-').to(BinaryOp::Sub)))
                .then(term)
                .repeated(),
            |lhs, (kind, rhs)| Node::Binary(kind, Box::new(lhs), Box::new(rhs)),
        );

        additive.clone().foldl(
            just("||").padded().ignore_then(additive).repeated(),
            |lhs, rhs| Node::Binary(BinaryOp::Concat, Box::new(lhs), Box::new(rhs)),
        )
    });

    expr.then_ignore(end())
}

fn eval(node: &Node, data: &ExtraData) -> Result<FieldValue, String> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Column(name) => data
            .get(name)
            .cloned()
            .ok_or_else(|| format!("column '{}' not found", name)),
        Node::Negate(inner) => match eval(inner, data)? {
            FieldValue::Null => Ok(FieldValue::Null),
            FieldValue::Integer(i) => Ok(i
                .checked_neg()
                .map_or(FieldValue::Float(-(i as f64)), FieldValue::Integer)),
            other => numeric(&other).map(|v| FieldValue::Float(-v)),
        },
        Node::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, data)?;
            let rhs = eval(rhs, data)?;
            if lhs.is_null() || rhs.is_null() {
                return Ok(FieldValue::Null);
            }
            apply(*op, &lhs, &rhs)
        }
    }
}

fn apply(op: BinaryOp, lhs: &FieldValue, rhs: &FieldValue) -> Result<FieldValue, String> {
    if op == BinaryOp::Concat {
        return Ok(FieldValue::Text(format!("{}{}", lhs, rhs)));
    }

    if let (FieldValue::Integer(a), FieldValue::Integer(b)) = (lhs, rhs) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Rem if *b != 0 => a.checked_rem(*b),
            _ => None,
        };
        if let Some(v) = exact {
            return Ok(FieldValue::Integer(v));
        }
    }

    let a = numeric(lhs)?;
    let b = numeric(rhs)?;
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return Ok(FieldValue::Null),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::Concat => unreachable!("handled above"),
    };
    Ok(FieldValue::Float(value))
}

fn numeric(value: &FieldValue) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("cannot convert '{}' to a number", value))
}
