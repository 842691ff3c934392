use std::ops::Range;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Coarse classification of an evaluation failure.
///
/// Several [`EvalError`] variants share a kind; callers that only need to
/// pick a message branch on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnbalancedParens,
    NegativeRoot,
    DivisionByZero,
    MalformedExpression,
}

#[derive(Error, Debug, Diagnostic)]
pub enum EvalError {
    #[error("square root must be followed by `(`")]
    #[diagnostic(
        code(sqrtcalc::missing_root_paren),
        help("write the argument in parentheses, e.g. `sqrt(16)`")
    )]
    MissingRootParen {
        #[source_code]
        src: NamedSource<String>,
        #[label("this square root")]
        span: SourceSpan,
    },

    #[error("unbalanced parentheses in square root argument")]
    #[diagnostic(
        code(sqrtcalc::unterminated_root),
        help("add the missing `)` to close the square root")
    )]
    UnterminatedRoot {
        #[source_code]
        src: NamedSource<String>,
        #[label("never closed")]
        span: SourceSpan,
    },

    #[error("unmatched `)`")]
    #[diagnostic(code(sqrtcalc::unmatched_close))]
    UnmatchedClose {
        #[source_code]
        src: NamedSource<String>,
        #[label("no `(` opens this")]
        span: SourceSpan,
    },

    #[error("unclosed `(`")]
    #[diagnostic(code(sqrtcalc::unclosed_paren), help("add the missing `)`"))]
    UnclosedParen {
        #[source_code]
        src: NamedSource<String>,
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("square root of negative number {value}")]
    #[diagnostic(
        code(sqrtcalc::negative_root),
        help("complex results are not supported")
    )]
    NegativeRoot {
        value: f64,
        #[source_code]
        src: NamedSource<String>,
        #[label("argument is negative")]
        span: SourceSpan,
    },

    #[error("division by zero")]
    #[diagnostic(code(sqrtcalc::division_by_zero))]
    DivisionByZero {
        #[source_code]
        src: NamedSource<String>,
        #[label("right-hand side is zero")]
        span: SourceSpan,
    },

    #[error("unexpected character '{token}'")]
    #[diagnostic(
        code(sqrtcalc::unexpected_character),
        help("remove or correct the character: `{token}`")
    )]
    UnexpectedCharacter {
        token: char,
        #[source_code]
        src: NamedSource<String>,
        #[label("this character")]
        span: SourceSpan,
    },

    #[error("invalid number `{literal}`")]
    #[diagnostic(code(sqrtcalc::invalid_number))]
    InvalidNumber {
        literal: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("this numeric literal")]
        span: SourceSpan,
    },

    #[error("operator `{op}` is missing an operand")]
    #[diagnostic(code(sqrtcalc::missing_operand))]
    MissingOperand {
        op: char,
        #[source_code]
        src: NamedSource<String>,
        #[label("this operator")]
        span: SourceSpan,
    },

    #[error("{count} values are left without an operator between them")]
    #[diagnostic(code(sqrtcalc::missing_operator))]
    MissingOperator {
        count: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("in this expression")]
        span: SourceSpan,
    },

    #[error("empty expression")]
    #[diagnostic(code(sqrtcalc::empty_expression))]
    EmptyExpression {
        #[source_code]
        src: NamedSource<String>,
        #[label("nothing to evaluate here")]
        span: SourceSpan,
    },
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRootParen { .. }
            | Self::UnterminatedRoot { .. }
            | Self::UnmatchedClose { .. }
            | Self::UnclosedParen { .. } => ErrorKind::UnbalancedParens,
            Self::NegativeRoot { .. } => ErrorKind::NegativeRoot,
            Self::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            Self::UnexpectedCharacter { .. }
            | Self::InvalidNumber { .. }
            | Self::MissingOperand { .. }
            | Self::MissingOperator { .. }
            | Self::EmptyExpression { .. } => ErrorKind::MalformedExpression,
        }
    }

    /// Whether the failure comes from a `sqrt(...)` call.
    pub fn concerns_root(&self) -> bool {
        matches!(
            self,
            Self::MissingRootParen { .. } | Self::UnterminatedRoot { .. } | Self::NegativeRoot { .. }
        )
    }

    /// Byte offset into the normalized expression where the problem starts.
    pub fn offset(&self) -> usize {
        self.span().offset()
    }

    fn span(&self) -> &SourceSpan {
        match self {
            Self::MissingRootParen { span, .. }
            | Self::UnterminatedRoot { span, .. }
            | Self::UnmatchedClose { span, .. }
            | Self::UnclosedParen { span, .. }
            | Self::NegativeRoot { span, .. }
            | Self::DivisionByZero { span, .. }
            | Self::UnexpectedCharacter { span, .. }
            | Self::InvalidNumber { span, .. }
            | Self::MissingOperand { span, .. }
            | Self::MissingOperator { span, .. }
            | Self::EmptyExpression { span, .. } => span,
        }
    }

    /// The normalized expression the span points into.
    pub fn source_text(&self) -> &str {
        let src = match self {
            Self::MissingRootParen { src, .. }
            | Self::UnterminatedRoot { src, .. }
            | Self::UnmatchedClose { src, .. }
            | Self::UnclosedParen { src, .. }
            | Self::NegativeRoot { src, .. }
            | Self::DivisionByZero { src, .. }
            | Self::UnexpectedCharacter { src, .. }
            | Self::InvalidNumber { src, .. }
            | Self::MissingOperand { src, .. }
            | Self::MissingOperator { src, .. }
            | Self::EmptyExpression { src, .. } => src,
        };
        src.inner()
    }
}

pub(crate) fn source(whole: &str) -> NamedSource<String> {
    NamedSource::new("<input>", whole.to_string())
}

pub(crate) fn span(range: Range<usize>) -> SourceSpan {
    SourceSpan::from(range)
}
