//! Serialized filter expression handed to sort/filter handlers.
//!
//! Grammar: one clause per filtered column, clauses joined by a single space.
//!
//! ```text
//! column:min(v),max(v),equals(v),noNull,noNonNull
//! ```
//!
//! Only the parts that are set are written. Text that would not read back
//! as itself is double-quoted with `\"` and `\\` escapes: column names
//! holding separators, and `equals` strings holding separators or spelling a
//! boolean or a number (`equals("true")`, `equals("John Smith")`).

use tabula_core::Value;

use super::{FilterSet, FilterSpec};
use crate::error::{ViewError, ViewResult};

pub struct FilterExpression;

impl FilterExpression {
    pub fn serialize(filters: &FilterSet) -> String {
        filters
            .iter()
            .filter(|(_, spec)| !spec.is_empty())
            .map(|(column, spec)| {
                format!(
                    "{}:{}",
                    quote_column(column),
                    Self::clause_parts(spec).join(",")
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn clause_parts(spec: &FilterSpec) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(min) = spec.min {
            parts.push(format!("min({})", min));
        }
        if let Some(max) = spec.max {
            parts.push(format!("max({})", max));
        }
        if let Some(equals) = &spec.equals {
            parts.push(format!("equals({})", equals_text(equals)));
        }
        if !spec.allow_null {
            parts.push("noNull".to_string());
        }
        if !spec.allow_non_null {
            parts.push("noNonNull".to_string());
        }
        parts
    }

    pub fn parse(expr: &str) -> ViewResult<FilterSet> {
        let mut filters = FilterSet::new();
        for clause in split_clauses(expr)? {
            let (column, body) = split_column(clause)?;
            if column.is_empty() {
                return Err(ViewError::InvalidFilterExpression(format!(
                    "missing column in clause '{}'",
                    clause
                )));
            }

            let mut spec = FilterSpec::default();
            for part in split_parts(body) {
                Self::apply_part(&mut spec, part)?;
            }
            filters.set(column, spec);
        }
        Ok(filters)
    }

    fn apply_part(spec: &mut FilterSpec, part: &str) -> ViewResult<()> {
        match part {
            "" => {}
            "noNull" => spec.allow_null = false,
            "noNonNull" => spec.allow_non_null = false,
            _ => {
                let (name, arg) = part
                    .strip_suffix(')')
                    .and_then(|p| p.split_once('('))
                    .ok_or_else(|| {
                        ViewError::InvalidFilterExpression(format!("malformed part '{}'", part))
                    })?;
                match name {
                    "min" => spec.min = Some(parse_bound(arg)?),
                    "max" => spec.max = Some(parse_bound(arg)?),
                    "equals" => spec.equals = Some(parse_equals(arg)?),
                    other => {
                        return Err(ViewError::InvalidFilterExpression(format!(
                            "unknown part '{}'",
                            other
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Characters that end a bare token somewhere in the grammar
fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | ':' | '"' | '\\')
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

fn quote_column(column: &str) -> String {
    if column.is_empty() || column.chars().any(is_separator) {
        quote(column)
    } else {
        column.to_string()
    }
}

fn equals_text(value: &Value) -> String {
    if matches!(value, Value::Bool(_)) || value.is_number() {
        return value.to_plain_string();
    }
    let text = value.to_plain_string();
    let reads_back = matches!(parse_bare(&text), Value::String(_));
    if text.chars().any(is_separator) || !reads_back {
        quote(&text)
    } else {
        text
    }
}

/// Byte index just past the closing quote of the quoted string at the start
/// of `text`
fn quoted_end(text: &str) -> ViewResult<usize> {
    let mut escaped = false;
    for (ix, ch) in text.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Ok(ix + 1),
            _ => {}
        }
    }
    Err(ViewError::InvalidFilterExpression(format!(
        "unterminated quote in '{}'",
        text
    )))
}

fn unquote(text: &str) -> ViewResult<String> {
    if !text.starts_with('"') || quoted_end(text)? != text.len() {
        return Err(ViewError::InvalidFilterExpression(format!(
            "malformed quoted text '{}'",
            text
        )));
    }
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for ch in text[1..text.len() - 1].chars() {
        if !escaped && ch == '\\' {
            escaped = true;
            continue;
        }
        escaped = false;
        out.push(ch);
    }
    Ok(out)
}

/// Split on whitespace outside quotes
fn split_clauses(expr: &str) -> ViewResult<Vec<&str>> {
    let mut clauses = Vec::new();
    let mut start = None;
    let mut rest = expr.char_indices().peekable();
    while let Some((ix, ch)) = rest.next() {
        if ch.is_whitespace() {
            if let Some(from) = start.take() {
                clauses.push(&expr[from..ix]);
            }
            continue;
        }
        start.get_or_insert(ix);
        if ch == '"' {
            let end = ix + quoted_end(&expr[ix..])?;
            // resume after the closing quote
            while rest.next_if(|(next, _)| *next < end).is_some() {}
        }
    }
    if let Some(from) = start {
        clauses.push(&expr[from..]);
    }
    Ok(clauses)
}

/// `(column, body)` of one clause; the column may be quoted
fn split_column(clause: &str) -> ViewResult<(String, &str)> {
    let missing_colon =
        || ViewError::InvalidFilterExpression(format!("missing ':' in clause '{}'", clause));
    if clause.starts_with('"') {
        let end = quoted_end(clause)?;
        let body = clause[end..].strip_prefix(':').ok_or_else(missing_colon)?;
        return Ok((unquote(&clause[..end])?, body));
    }
    let (column, body) = clause.split_once(':').ok_or_else(missing_colon)?;
    Ok((column.to_string(), body))
}

/// Split on commas that are not inside parentheses or quotes
fn split_parts(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (ix, ch) in body.char_indices() {
        if in_quotes {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..ix]);
                start = ix + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_bound(arg: &str) -> ViewResult<f64> {
    arg.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
        .ok_or_else(|| ViewError::InvalidFilterExpression(format!("'{}' is not a number", arg)))
}

fn parse_equals(arg: &str) -> ViewResult<Value> {
    if arg.starts_with('"') {
        return unquote(arg).map(Value::String);
    }
    Ok(parse_bare(arg))
}

/// Unquoted `equals` argument: boolean, then integer, then float, then text
fn parse_bare(arg: &str) -> Value {
    match arg {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = arg.parse::<i64>() {
        return Value::Int64(n);
    }
    match arg.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Float64(n),
        _ => Value::String(arg.to_string()),
    }
}
