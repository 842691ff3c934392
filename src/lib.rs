pub mod error;
pub mod eval;
pub mod lex;
pub mod percent;
pub mod session;

pub use error::{ErrorKind, EvalError};
pub use eval::{Evaluator, evaluate, format_result};
pub use lex::Lexer;
pub use percent::convert_last_number_to_percent;
pub use session::{Notice, Session};
