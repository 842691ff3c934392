//! The `%` key: rewrite the last number of an expression as a fraction of 100.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::eval::format_result;

lazy_static! {
    /// Last (optionally signed, optionally decimal) ASCII number, followed
    /// only by non-numeric characters up to the end of the input.
    static ref LAST_NUMBER: Regex = Regex::new(r"([-+]?[0-9]*\.?[0-9]+)([^0-9.]*)$").unwrap();
}

/// Divides the last number in `expression` by 100, in place.
///
/// `"50+20"` becomes `"50+0.2"` and `"3*(40)"` becomes `"3*(0.4)"`. An empty
/// expression or `"0"` yields `"0"`; text without a number is returned as is.
///
/// A sign directly before the number belongs to it. A `-` ends up in the
/// scaled value anyway; a `+` is written back explicitly, so `"12+34"` turns
/// into `"12+0.34"` rather than gluing the digits into `"120.34"`.
pub fn convert_last_number_to_percent(expression: &str) -> String {
    if expression.is_empty() || expression == "0" {
        return "0".to_string();
    }

    let Some(captures) = LAST_NUMBER.captures(expression) else {
        return expression.to_string();
    };
    let (Some(number), Some(tail)) = (captures.get(1), captures.get(2)) else {
        return expression.to_string();
    };
    let Ok(value) = number.as_str().parse::<f64>() else {
        return expression.to_string();
    };

    let mut scaled = format_result(value / 100.0);
    if number.as_str().starts_with('+') {
        scaled.insert(0, '+');
    }
    trace!(number = number.as_str(), %scaled, "percent");

    format!(
        "{}{}{}",
        &expression[..number.start()],
        scaled,
        tail.as_str()
    )
}
