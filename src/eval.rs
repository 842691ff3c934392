use std::{fmt::Display, ops::Range};

use tracing::{debug, trace};

use crate::{
    error::{EvalError, source, span},
    lex::{Lexer, TokenKind, normalize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
}

impl Op {
    /// Ties reduce the operator already on the stack, so `^` groups left too.
    pub fn precedence(self) -> u8 {
        match self {
            Op::Caret => 4,
            Op::Star | Op::Slash => 2,
            Op::Plus | Op::Minus => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Op::Plus => '+',
            Op::Minus => '-',
            Op::Star => '*',
            Op::Slash => '/',
            Op::Caret => '^',
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Open,
    Binary(Op),
}

/// One evaluation frame: a lexer over (part of) a normalized expression and
/// the two stacks it reduces into. Square-root bodies get a frame of their own.
pub struct Evaluator<'de> {
    lexer: Lexer<'de>,
    range: Range<usize>,
    operands: Vec<f64>,
    operators: Vec<(Pending, usize)>,
}

/// Evaluates an infix expression such as `2+sqrt(16)*50%`.
///
/// Whitespace is ignored. Fails with an [`EvalError`] whose
/// [`kind`](EvalError::kind) tells unbalanced parentheses, negative roots,
/// division by zero and other malformed input apart.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let normalized = normalize(expression);
    let result = Evaluator::new(&normalized).run();
    match &result {
        Ok(value) => debug!(expression, value = *value, "evaluated"),
        Err(e) => debug!(expression, error = %e, "evaluation failed"),
    }
    result
}

/// Renders a result so that evaluating the text yields the same value.
pub fn format_result(value: f64) -> String {
    if value == 0.0 {
        // no "-0" in history lines
        return "0".to_string();
    }
    value.to_string()
}

impl<'de> Evaluator<'de> {
    pub fn new(normalized: &'de str) -> Self {
        Self::within(normalized, 0..normalized.len())
    }

    fn within(normalized: &'de str, range: Range<usize>) -> Self {
        Self {
            lexer: Lexer::within(normalized, range.clone()),
            range,
            operands: Vec::new(),
            operators: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<f64, EvalError> {
        while let Some(token) = self.lexer.next() {
            let token = token?;
            let op = match &token.kind {
                TokenKind::Number(n) => {
                    self.operands.push(*n);
                    continue;
                }
                TokenKind::Root { body } => {
                    let value = Evaluator::within(self.lexer.whole(), body.clone()).run()?;
                    if value < 0.0 {
                        return Err(EvalError::NegativeRoot {
                            value,
                            src: source(self.lexer.whole()),
                            span: span(token.span()),
                        });
                    }
                    trace!(value, "square root");
                    self.operands.push(value.sqrt());
                    continue;
                }
                TokenKind::LeftParen => {
                    self.operators.push((Pending::Open, token.offset));
                    continue;
                }
                TokenKind::RightParen => {
                    self.close_group(token.span())?;
                    continue;
                }
                TokenKind::Plus => Op::Plus,
                TokenKind::Minus => Op::Minus,
                TokenKind::Star => Op::Star,
                TokenKind::Slash => Op::Slash,
                TokenKind::Caret => Op::Caret,
            };

            while let Some(&(Pending::Binary(top), offset)) = self.operators.last() {
                if top.precedence() < op.precedence() {
                    break;
                }
                self.operators.pop();
                self.reduce(top, offset)?;
            }
            self.operators.push((Pending::Binary(op), token.offset));
        }

        while let Some((pending, offset)) = self.operators.pop() {
            match pending {
                Pending::Open => {
                    return Err(EvalError::UnclosedParen {
                        src: source(self.lexer.whole()),
                        span: span(offset..offset + 1),
                    });
                }
                Pending::Binary(op) => self.reduce(op, offset)?,
            }
        }

        match self.operands.as_slice() {
            [value] => Ok(*value),
            [] => Err(EvalError::EmptyExpression {
                src: source(self.lexer.whole()),
                span: span(self.range.clone()),
            }),
            values => Err(EvalError::MissingOperator {
                count: values.len(),
                src: source(self.lexer.whole()),
                span: span(self.range.clone()),
            }),
        }
    }

    fn close_group(&mut self, close: Range<usize>) -> Result<(), EvalError> {
        loop {
            match self.operators.pop() {
                Some((Pending::Open, _)) => return Ok(()),
                Some((Pending::Binary(op), offset)) => self.reduce(op, offset)?,
                None => {
                    return Err(EvalError::UnmatchedClose {
                        src: source(self.lexer.whole()),
                        span: span(close),
                    });
                }
            }
        }
    }

    /// Pops `b`, then `a`, and pushes `a op b`.
    fn reduce(&mut self, op: Op, offset: usize) -> Result<(), EvalError> {
        let (Some(b), Some(a)) = (self.operands.pop(), self.operands.pop()) else {
            return Err(EvalError::MissingOperand {
                op: op.symbol(),
                src: source(self.lexer.whole()),
                span: span(offset..offset + 1),
            });
        };

        let value = match op {
            Op::Plus => a + b,
            Op::Minus => a - b,
            Op::Star => a * b,
            Op::Slash => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero {
                        src: source(self.lexer.whole()),
                        span: span(offset..offset + 1),
                    });
                }
                a / b
            }
            Op::Caret => a.powf(b),
        };
        trace!(a, %op, b, value, "reduce");
        self.operands.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn eval(input: &str) -> f64 {
        evaluate(input).unwrap_or_else(|e| panic!("`{input}` failed: {e}"))
    }

    fn kind(input: &str) -> ErrorKind {
        match evaluate(input) {
            Ok(value) => panic!("`{input}` evaluated to {value}"),
            Err(e) => e.kind(),
        }
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("2+3*4"), 14.0);
        assert_eq!(eval("(2+3)*4"), 20.0);
        assert_eq!(eval("2*3^2"), 18.0);
        assert_eq!(eval("8/2/2"), 2.0);
        assert_eq!(eval("10-4-3"), 3.0);
        assert_eq!(eval("((7))"), 7.0);
    }

    #[test]
    fn power_groups_left() {
        assert_eq!(eval("2^3^2"), 64.0);
        assert_eq!(eval("2^-1"), 0.5);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval("-5+3"), -2.0);
        assert_eq!(eval("2--3"), 5.0);
        assert_eq!(eval("50%-3"), -2.5);
        assert!((eval("5%-3") + 2.95).abs() < 1e-12);
        assert_eq!(eval("4*(-2)"), -8.0);
        assert_eq!(eval("-.5*4"), -2.0);
    }

    #[test]
    fn minus_before_group_is_not_a_sign() {
        assert_eq!(kind("-(3)"), ErrorKind::MalformedExpression);
        assert_eq!(kind("-sqrt(4)"), ErrorKind::MalformedExpression);
    }

    #[test]
    fn percent_literals() {
        assert_eq!(eval("5%"), 0.05);
        assert_eq!(eval("50%*4"), 2.0);
        assert_eq!(eval("200*10%"), 20.0);
        assert_eq!(eval("-50%"), -0.5);
    }

    #[test]
    fn square_roots() {
        assert_eq!(eval("sqrt(16)"), 4.0);
        assert_eq!(eval("sqrt(sqrt(16))"), 2.0);
        assert_eq!(eval("sqrt(4)*sqrt(9)"), 6.0);
        assert_eq!(eval("1+sqrt((1+2)*3)"), 4.0);
        assert_eq!(eval("sqrt( 2 + 2 ) * 2"), 4.0);
        assert_eq!(eval("sqrt(-4+4)"), 0.0);
    }

    #[test]
    fn root_failures() {
        assert_eq!(kind("sqrt(-1)"), ErrorKind::NegativeRoot);
        assert_eq!(kind("sqrt(1-5)"), ErrorKind::NegativeRoot);
        assert_eq!(kind("sqrt(16"), ErrorKind::UnbalancedParens);
        assert_eq!(kind("2+√4"), ErrorKind::UnbalancedParens);
        assert_eq!(kind("sqrt()"), ErrorKind::MalformedExpression);
        assert_eq!(kind("sqrt(2/0)"), ErrorKind::DivisionByZero);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(kind("10/0"), ErrorKind::DivisionByZero);
        assert_eq!(kind("1/(2-2)"), ErrorKind::DivisionByZero);
        assert_eq!(kind("1/-0"), ErrorKind::DivisionByZero);
        assert_eq!(eval("0/5"), 0.0);
    }

    #[test]
    fn power_domain_errors_are_nan() {
        assert!(eval("(-8)^0.5").is_nan());
    }

    #[test]
    fn unbalanced_parentheses() {
        assert_eq!(kind("3+(2"), ErrorKind::UnbalancedParens);
        assert_eq!(kind("1+2)"), ErrorKind::UnbalancedParens);
        assert_eq!(kind(")"), ErrorKind::UnbalancedParens);

        let err = evaluate("1+2)").unwrap_err();
        assert_eq!(err.offset(), 3);
        let err = evaluate("3+(2").unwrap_err();
        assert_eq!(err.offset(), 2);
    }

    #[test]
    fn malformed_input() {
        assert_eq!(kind(""), ErrorKind::MalformedExpression);
        assert_eq!(kind("   "), ErrorKind::MalformedExpression);
        assert_eq!(kind("5+"), ErrorKind::MalformedExpression);
        assert_eq!(kind("*5"), ErrorKind::MalformedExpression);
        assert_eq!(kind("2(3)"), ErrorKind::MalformedExpression);
        assert_eq!(kind("1..2"), ErrorKind::MalformedExpression);
        assert_eq!(kind("2+x"), ErrorKind::MalformedExpression);
        assert_eq!(kind("5%%"), ErrorKind::MalformedExpression);
    }

    #[test]
    fn diagnostics_point_into_normalized_source() {
        let err = evaluate("1 / 0").unwrap_err();
        assert_eq!(err.source_text(), "1/0");
        assert_eq!(err.offset(), 1);

        let err = evaluate("2 + sqrt(0-9)").unwrap_err();
        assert_eq!(err.source_text(), "2+√(0-9)");
        assert_eq!(err.offset(), 2);

        let err = evaluate("7 +").unwrap_err();
        assert_eq!(err.to_string(), "operator `+` is missing an operand");
    }

    #[test]
    fn formatted_results_evaluate_to_themselves() {
        for input in ["2+3*4", "1/3", "-7/2", "2^0.5", "10^20", "1/1024", "sqrt(2)", "0*-1"] {
            let value = eval(input);
            let text = format_result(value);
            assert_eq!(eval(&text), value, "{input} -> {text}");
        }
    }

    #[test]
    fn format_result_text() {
        assert_eq!(format_result(14.0), "14");
        assert_eq!(format_result(0.05), "0.05");
        assert_eq!(format_result(-2.5), "-2.5");
        assert_eq!(format_result(-0.0), "0");
    }
}
