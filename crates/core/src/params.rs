// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parameter substitution and expansion.
//!
//! Parameter maps may reference other parameters as `$name` / `${name}`
//! (resolved topologically) and embed back-tick arithmetic expressions
//! evaluated after substitution. List-valued parameters expand into a
//! Cartesian product of single-valued maps.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// Ordered parameter map, name → scalar or list.
pub type Params = IndexMap<String, Value>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("parameter '{0}' references itself")]
    SelfReference(String),
    #[error("circular parameter dependency: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("parameter '{name}' references undefined parameter '{reference}'")]
    Undefined { name: String, reference: String },
    #[error("template references undefined parameter '{0}'")]
    UndefinedInTemplate(String),
    #[error("invalid expression `{expr}` in parameter '{name}': {reason}")]
    Expression { name: String, expr: String, reason: String },
}

// ---------------------------------------------------------------------------
// Template segments
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Segment {
    Literal(String),
    Ref(String),
}

/// Split `$name`, `${name}`, and `$$` (escaped dollar) out of a template.
fn parse_segments(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            literal.push(ch);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                literal.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Ref(name));
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Ref(name));
            }
            _ => literal.push('$'),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

fn refs_in_value(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for seg in parse_segments(s) {
                if let Segment::Ref(name) = seg {
                    refs.push(name);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                refs_in_value(item, refs);
            }
        }
        _ => {}
    }
}

/// Textual form of a scalar for splicing into strings and environments.
/// Booleans render as `true`/`false`.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Topological substitution
// ---------------------------------------------------------------------------

/// Resolve every `$name` reference and back-tick expression in `params`.
///
/// References are resolved in dependency order regardless of declaration
/// order. A value that is exactly one reference adopts the referenced
/// value (type-preserving); embedded references splice in the scalar's
/// textual form. Self-references and cycles are errors.
pub fn substitute(params: &Params) -> Result<Params, ParamError> {
    let mut deps: IndexMap<&str, Vec<String>> = IndexMap::new();
    for (name, value) in params {
        let mut refs = Vec::new();
        refs_in_value(value, &mut refs);
        refs.retain(|r| params.contains_key(r));
        if refs.iter().any(|r| r == name) {
            return Err(ParamError::SelfReference(name.clone()));
        }
        deps.insert(name.as_str(), refs);
    }

    let order = topo_order(&deps)?;

    let mut resolved = Params::new();
    for name in order {
        let value = &params[&name];
        let new_value = resolve_value(&name, value, &resolved, params)?;
        resolved.insert(name, new_value);
    }

    // restore declaration order
    let mut out = Params::new();
    for name in params.keys() {
        if let Some(value) = resolved.get(name) {
            out.insert(name.clone(), value.clone());
        }
    }
    Ok(out)
}

/// Depth-first topological sort; reports the cycle path on failure.
fn topo_order(deps: &IndexMap<&str, Vec<String>>) -> Result<Vec<String>, ParamError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(
        name: &str,
        deps: &IndexMap<&str, Vec<String>>,
        marks: &mut IndexMap<String, Mark>,
        path: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), ParamError> {
        match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|p| p == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].to_vec();
                cycle.push(name.to_string());
                return Err(ParamError::Cycle(cycle));
            }
            Mark::Unvisited => {}
        }
        marks.insert(name.to_string(), Mark::InProgress);
        path.push(name.to_string());
        if let Some(refs) = deps.get(name) {
            for r in refs {
                visit(r, deps, marks, path, order)?;
            }
        }
        path.pop();
        marks.insert(name.to_string(), Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    let mut marks = IndexMap::new();
    let mut order = Vec::new();
    for name in deps.keys() {
        visit(name, deps, &mut marks, &mut Vec::new(), &mut order)?;
    }
    Ok(order)
}

fn resolve_value(
    name: &str,
    value: &Value,
    resolved: &Params,
    all: &Params,
) -> Result<Value, ParamError> {
    match value {
        Value::String(s) => resolve_string(name, s, resolved, all),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(name, item, resolved, all)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(
    name: &str,
    input: &str,
    resolved: &Params,
    all: &Params,
) -> Result<Value, ParamError> {
    let segments = parse_segments(input);

    // a lone reference adopts the referenced value as-is
    if let [Segment::Ref(r)] = segments.as_slice() {
        if let Some(v) = lookup(r, resolved, all, name)? {
            return Ok(v);
        }
    }

    let mut text = String::new();
    for seg in &segments {
        match seg {
            Segment::Literal(s) => text.push_str(s),
            Segment::Ref(r) => match lookup(r, resolved, all, name)? {
                Some(v) => text.push_str(&scalar_text(&v)),
                None => {
                    // not a parameter: keep the reference for the shell
                    text.push('$');
                    text.push_str(r);
                }
            },
        }
    }

    evaluate_backticks(name, &text)
}

fn lookup(
    reference: &str,
    resolved: &Params,
    all: &Params,
    owner: &str,
) -> Result<Option<Value>, ParamError> {
    if let Some(v) = resolved.get(reference) {
        return Ok(Some(v.clone()));
    }
    if all.contains_key(reference) {
        // in the map but not resolved yet: topological order was violated,
        // which only happens for self/cyclic references already rejected
        return Err(ParamError::Undefined {
            name: owner.to_string(),
            reference: reference.to_string(),
        });
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Back-tick expressions
// ---------------------------------------------------------------------------

fn evaluate_backticks(name: &str, input: &str) -> Result<Value, ParamError> {
    if !input.contains('`') {
        return Ok(Value::String(input.to_string()));
    }

    let mut parts = input.split('`');
    let mut pieces: Vec<(bool, String)> = Vec::new(); // (is_expr, text)
    let mut is_expr = false;
    let mut count = 0;
    for part in parts.by_ref() {
        pieces.push((is_expr, part.to_string()));
        is_expr = !is_expr;
        count += 1;
    }
    if count % 2 == 0 {
        return Err(ParamError::Expression {
            name: name.to_string(),
            expr: input.to_string(),
            reason: "unterminated back-tick expression".to_string(),
        });
    }

    // a string that is exactly one expression keeps the numeric type
    if pieces.len() == 3 && pieces[0].1.is_empty() && pieces[2].1.is_empty() {
        let expr_text = &pieces[1].1;
        let num = expr::eval(expr_text).map_err(|reason| ParamError::Expression {
            name: name.to_string(),
            expr: expr_text.clone(),
            reason,
        })?;
        return num.into_value().ok_or_else(|| ParamError::Expression {
            name: name.to_string(),
            expr: expr_text.clone(),
            reason: "expression result is not a finite number".to_string(),
        });
    }

    let mut text = String::new();
    for (is_expr, part) in &pieces {
        if *is_expr {
            let num = expr::eval(part).map_err(|reason| ParamError::Expression {
                name: name.to_string(),
                expr: part.clone(),
                reason,
            })?;
            text.push_str(&num.to_text());
        } else {
            text.push_str(part);
        }
    }
    Ok(Value::String(text))
}

/// Minimal arithmetic: integers and floats, `+ - * / %`, unary minus,
/// parentheses. Integer division stays integral when exact.
mod expr {
    use serde_json::Value;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub(super) enum Num {
        Int(i64),
        Float(f64),
    }

    impl Num {
        pub(super) fn into_value(self) -> Option<Value> {
            match self {
                Num::Int(i) => Some(Value::from(i)),
                Num::Float(f) => serde_json::Number::from_f64(f).map(Value::Number),
            }
        }

        pub(super) fn to_text(self) -> String {
            match self {
                Num::Int(i) => i.to_string(),
                Num::Float(f) => f.to_string(),
            }
        }

        fn as_f64(self) -> f64 {
            match self {
                Num::Int(i) => i as f64,
                Num::Float(f) => f,
            }
        }
    }

    struct Parser<'a> {
        input: &'a [u8],
        pos: usize,
    }

    pub(super) fn eval(input: &str) -> Result<Num, String> {
        let mut p = Parser { input: input.as_bytes(), pos: 0 };
        p.skip_ws();
        let value = p.expr()?;
        p.skip_ws();
        if p.pos != p.input.len() {
            return Err(format!("unexpected trailing input at offset {}", p.pos));
        }
        Ok(value)
    }

    impl Parser<'_> {
        fn skip_ws(&mut self) {
            while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
        }

        fn peek(&self) -> Option<u8> {
            self.input.get(self.pos).copied()
        }

        fn expr(&mut self) -> Result<Num, String> {
            let mut acc = self.term()?;
            loop {
                self.skip_ws();
                match self.peek() {
                    Some(b'+') => {
                        self.pos += 1;
                        acc = add(acc, self.term()?);
                    }
                    Some(b'-') => {
                        self.pos += 1;
                        acc = sub(acc, self.term()?);
                    }
                    _ => return Ok(acc),
                }
            }
        }

        fn term(&mut self) -> Result<Num, String> {
            let mut acc = self.factor()?;
            loop {
                self.skip_ws();
                match self.peek() {
                    Some(b'*') => {
                        self.pos += 1;
                        acc = mul(acc, self.factor()?);
                    }
                    Some(b'/') => {
                        self.pos += 1;
                        acc = div(acc, self.factor()?)?;
                    }
                    Some(b'%') => {
                        self.pos += 1;
                        acc = rem(acc, self.factor()?)?;
                    }
                    _ => return Ok(acc),
                }
            }
        }

        fn factor(&mut self) -> Result<Num, String> {
            self.skip_ws();
            match self.peek() {
                Some(b'-') => {
                    self.pos += 1;
                    Ok(neg(self.factor()?))
                }
                Some(b'(') => {
                    self.pos += 1;
                    let inner = self.expr()?;
                    self.skip_ws();
                    if self.peek() != Some(b')') {
                        return Err("missing closing parenthesis".to_string());
                    }
                    self.pos += 1;
                    Ok(inner)
                }
                Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
                Some(c) => Err(format!("unexpected character '{}'", c as char)),
                None => Err("unexpected end of expression".to_string()),
            }
        }

        fn number(&mut self) -> Result<Num, String> {
            let start = self.pos;
            let mut is_float = false;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.pos += 1;
                } else if c == b'.' && !is_float {
                    is_float = true;
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let text = std::str::from_utf8(&self.input[start..self.pos])
                .map_err(|_| "invalid number".to_string())?;
            if is_float {
                text.parse::<f64>().map(Num::Float).map_err(|e| e.to_string())
            } else {
                text.parse::<i64>().map(Num::Int).map_err(|e| e.to_string())
            }
        }
    }

    fn neg(a: Num) -> Num {
        match a {
            Num::Int(i) => Num::Int(-i),
            Num::Float(f) => Num::Float(-f),
        }
    }

    fn add(a: Num, b: Num) -> Num {
        match (a, b) {
            (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_add(y)),
            _ => Num::Float(a.as_f64() + b.as_f64()),
        }
    }

    fn sub(a: Num, b: Num) -> Num {
        match (a, b) {
            (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_sub(y)),
            _ => Num::Float(a.as_f64() - b.as_f64()),
        }
    }

    fn mul(a: Num, b: Num) -> Num {
        match (a, b) {
            (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_mul(y)),
            _ => Num::Float(a.as_f64() * b.as_f64()),
        }
    }

    fn div(a: Num, b: Num) -> Result<Num, String> {
        match (a, b) {
            (Num::Int(x), Num::Int(y)) => {
                if y == 0 {
                    Err("division by zero".to_string())
                } else if x % y == 0 {
                    Ok(Num::Int(x / y))
                } else {
                    Ok(Num::Float(x as f64 / y as f64))
                }
            }
            _ => {
                let d = b.as_f64();
                if d == 0.0 {
                    Err("division by zero".to_string())
                } else {
                    Ok(Num::Float(a.as_f64() / d))
                }
            }
        }
    }

    fn rem(a: Num, b: Num) -> Result<Num, String> {
        match (a, b) {
            (Num::Int(x), Num::Int(y)) => {
                if y == 0 {
                    Err("modulo by zero".to_string())
                } else {
                    Ok(Num::Int(x % y))
                }
            }
            _ => {
                let d = b.as_f64();
                if d == 0.0 {
                    Err("modulo by zero".to_string())
                } else {
                    Ok(Num::Float(a.as_f64() % d))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cartesian product
// ---------------------------------------------------------------------------

/// Expand list-valued entries into the Cartesian product of single-value
/// maps, preserving declaration order within each map. A map without list
/// values yields itself; an empty list yields no maps.
pub fn product(params: &Params) -> Vec<Params> {
    let list_lens: Vec<(usize, usize)> = params
        .iter()
        .enumerate()
        .filter_map(|(i, (_, v))| v.as_array().map(|a| (i, a.len())))
        .collect();

    if list_lens.is_empty() {
        return vec![params.clone()];
    }
    if list_lens.iter().any(|(_, len)| *len == 0) {
        return Vec::new();
    }

    let mut combos = Vec::new();
    let mut indices = vec![0usize; list_lens.len()];
    loop {
        let mut map = Params::new();
        for (i, (name, value)) in params.iter().enumerate() {
            match value.as_array() {
                Some(items) => {
                    let slot = list_lens
                        .iter()
                        .position(|(idx, _)| *idx == i)
                        .unwrap_or_default();
                    map.insert(name.clone(), items[indices[slot]].clone());
                }
                None => {
                    map.insert(name.clone(), value.clone());
                }
            }
        }
        combos.push(map);

        // odometer increment, last key varies fastest
        let mut slot = list_lens.len();
        loop {
            if slot == 0 {
                return combos;
            }
            slot -= 1;
            indices[slot] += 1;
            if indices[slot] < list_lens[slot].1 {
                break;
            }
            indices[slot] = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// One-shot template expansion (artifact destinations)
// ---------------------------------------------------------------------------

/// Expand `$name` references in a template against a resolved parameter
/// map. Unlike [`substitute`], every reference must name a parameter.
pub fn expand(template: &str, params: &Params) -> Result<String, ParamError> {
    let mut out = String::new();
    for seg in parse_segments(template) {
        match seg {
            Segment::Literal(s) => out.push_str(&s),
            Segment::Ref(name) => match params.get(&name) {
                Some(v) => out.push_str(&scalar_text(v)),
                None => return Err(ParamError::UndefinedInTemplate(name)),
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
