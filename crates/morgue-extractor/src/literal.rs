//! Restricted evaluator for the object-literal subset of page scripts
//!
//! Body content ships as a script of the form
//!
//! ```text
//! window.Fusion=window.Fusion||{};Fusion.arcSite="...";Fusion.globalContent={...};
//! ```
//!
//! Accepted grammar:
//!
//! ```text
//! program    := (statement ';'?)*
//! statement  := ('var'|'let'|'const') ident ('=' expr)? (',' ident ('=' expr)?)*
//!             | path '=' expr
//!             | expr
//! expr       := and ('||' and)*
//! and        := unary ('&&' unary)*
//! unary      := '!' unary | '-' number | primary
//! primary    := object | array | string | number | true | false | null
//!             | undefined | NaN | Infinity | path | '(' expr ')'
//! path       := ident ('.' ident | '[' (string | number) ']')*
//! ```
//!
//! Anything else (calls, functions, operators beyond the above) is a parse
//! error. `window`, `self` and `globalThis` name the global scope itself.

use morgue_domain::traits::{EvaluationError, ScriptEvaluator};
use serde_json::{Map, Number, Value};
use std::time::{Duration, Instant};

/// Identifiers that refer to the global scope
const GLOBAL_ALIASES: [&str; 3] = ["window", "self", "globalThis"];

/// Deadline is checked every this many evaluation steps
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// [`ScriptEvaluator`] for the literal subset used by page state scripts
#[derive(Debug, Clone, Copy)]
pub struct LiteralEvaluator {
    max_depth: usize,
}

impl LiteralEvaluator {
    /// Create an evaluator with the given nesting limit
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for LiteralEvaluator {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ScriptEvaluator for LiteralEvaluator {
    fn evaluate(
        &self,
        script: &str,
        globals: &[&str],
        budget: Duration,
    ) -> Result<Value, EvaluationError> {
        let started = Instant::now();
        let mut scope = Map::new();
        for name in globals {
            if !GLOBAL_ALIASES.contains(name) {
                scope.insert(name.to_string(), Value::Object(Map::new()));
            }
        }

        let mut interpreter = Interpreter {
            src: script,
            pos: 0,
            depth: 0,
            max_depth: self.max_depth,
            steps: 0,
            deadline: started.checked_add(budget),
            budget,
            scope,
        };
        interpreter.run()?;
        Ok(Value::Object(interpreter.scope))
    }
}

struct Interpreter<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
    steps: u64,
    deadline: Option<Instant>,
    budget: Duration,
    scope: Map<String, Value>,
}

type EvalResult<T> = Result<T, EvaluationError>;

impl<'a> Interpreter<'a> {
    fn run(&mut self) -> EvalResult<()> {
        loop {
            self.skip_trivia()?;
            if self.at_end() {
                return Ok(());
            }
            if self.eat(b';') {
                continue;
            }
            self.statement()?;
        }
    }

    fn statement(&mut self) -> EvalResult<()> {
        self.tick()?;
        let start = self.pos;

        if let Some(word) = self.peek_ident() {
            if matches!(word, "var" | "let" | "const") {
                self.pos += word.len();
                return self.declaration();
            }

            let path = self.path()?;
            self.skip_trivia()?;
            if self.peek() == Some(b'=') && self.peek_at(1) != Some(b'=') {
                self.pos += 1;
                let value = self.expr()?;
                return self.assign(&path, value, start);
            }
            self.pos = start;
        }

        self.expr().map(|_| ())
    }

    fn declaration(&mut self) -> EvalResult<()> {
        loop {
            self.skip_trivia()?;
            let name = self
                .peek_ident()
                .ok_or_else(|| self.parse_error("expected identifier"))?
                .to_string();
            self.pos += name.len();
            self.skip_trivia()?;

            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.expr()?
            } else {
                Value::Null
            };
            self.scope.insert(name, value);

            self.skip_trivia()?;
            if !self.eat(b',') {
                return Ok(());
            }
        }
    }

    fn assign(&mut self, path: &[String], value: Value, at: usize) -> EvalResult<()> {
        let path = strip_global_alias(path);
        let Some((last, parents)) = path.split_last() else {
            return Err(EvaluationError::Runtime(format!(
                "cannot assign to the global object at byte {}",
                at
            )));
        };

        let mut target = &mut self.scope;
        for segment in parents {
            target = match target.get_mut(segment) {
                Some(Value::Object(obj)) => obj,
                _ => {
                    return Err(EvaluationError::Runtime(format!(
                        "cannot set property '{}' of undefined '{}'",
                        last, segment
                    )))
                }
            };
        }
        target.insert(last.clone(), value);
        Ok(())
    }

    fn lookup(&self, path: &[String]) -> EvalResult<Value> {
        let path = strip_global_alias(path);
        let Some((first, rest)) = path.split_first() else {
            return Ok(Value::Object(self.scope.clone()));
        };

        let mut current = self.scope.get(first);
        let mut owner = first.as_str();
        for segment in rest {
            current = match current {
                None | Some(Value::Null) => {
                    return Err(EvaluationError::Runtime(format!(
                        "cannot read property '{}' of undefined '{}'",
                        segment, owner
                    )))
                }
                Some(Value::Object(obj)) => obj.get(segment),
                Some(Value::Array(items)) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                Some(_) => None,
            };
            owner = segment.as_str();
        }
        Ok(current.cloned().unwrap_or(Value::Null))
    }

    fn expr(&mut self) -> EvalResult<Value> {
        let mut left = self.and_expr()?;
        loop {
            self.skip_trivia()?;
            if !self.eat_str("||") {
                return Ok(left);
            }
            let right = self.and_expr()?;
            if !truthy(&left) {
                left = right;
            }
        }
    }

    fn and_expr(&mut self) -> EvalResult<Value> {
        let mut left = self.unary()?;
        loop {
            self.skip_trivia()?;
            if !self.eat_str("&&") {
                return Ok(left);
            }
            let right = self.unary()?;
            if truthy(&left) {
                left = right;
            }
        }
    }

    fn unary(&mut self) -> EvalResult<Value> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'!') if self.peek_at(1) != Some(b'=') => {
                self.pos += 1;
                self.enter()?;
                let value = self.unary()?;
                self.leave();
                Ok(Value::Bool(!truthy(&value)))
            }
            Some(b'-') => {
                self.pos += 1;
                self.skip_trivia()?;
                match self.number()? {
                    Value::Number(n) => Ok(negate(&n)),
                    other => Ok(other),
                }
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> EvalResult<Value> {
        self.tick()?;
        self.skip_trivia()?;

        let value = match self.peek() {
            None => return Err(self.parse_error("unexpected end of script")),
            Some(b'{') => self.object()?,
            Some(b'[') => self.array()?,
            Some(q @ (b'"' | b'\'')) => Value::String(self.string(q)?),
            Some(b'0'..=b'9' | b'.') => self.number()?,
            Some(b'(') => {
                self.pos += 1;
                self.enter()?;
                let value = self.expr()?;
                self.skip_trivia()?;
                self.expect(b')')?;
                self.leave();
                value
            }
            Some(b'`') => return Err(self.parse_error("template literals are not supported")),
            Some(_) => match self.peek_ident() {
                Some("true") => self.keyword(4, Value::Bool(true)),
                Some("false") => self.keyword(5, Value::Bool(false)),
                Some("null") => self.keyword(4, Value::Null),
                Some("undefined") => self.keyword(9, Value::Null),
                Some("NaN") => self.keyword(3, Value::Null),
                Some("Infinity") => self.keyword(8, Value::Null),
                Some("function" | "new" | "class" | "typeof" | "delete" | "void") => {
                    return Err(self.parse_error("unsupported construct"))
                }
                Some(_) => {
                    let path = self.path()?;
                    self.lookup(&path)?
                }
                None => return Err(self.parse_error("unexpected character")),
            },
        };

        self.skip_trivia()?;
        if self.peek() == Some(b'(') {
            return Err(self.parse_error("function calls are not supported"));
        }
        Ok(value)
    }

    fn keyword(&mut self, len: usize, value: Value) -> Value {
        self.pos += len;
        value
    }

    fn path(&mut self) -> EvalResult<Vec<String>> {
        let first = self
            .peek_ident()
            .ok_or_else(|| self.parse_error("expected identifier"))?
            .to_string();
        self.pos += first.len();
        let mut path = vec![first];

        loop {
            let checkpoint = self.pos;
            self.skip_trivia()?;
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    self.skip_trivia()?;
                    let name = self
                        .peek_ident()
                        .ok_or_else(|| self.parse_error("expected property name"))?
                        .to_string();
                    self.pos += name.len();
                    path.push(name);
                }
                Some(b'[') => {
                    self.pos += 1;
                    self.skip_trivia()?;
                    let key = match self.peek() {
                        Some(q @ (b'"' | b'\'')) => self.string(q)?,
                        Some(b'0'..=b'9') => self.number_text()?.to_string(),
                        _ => return Err(self.parse_error("computed member must be a literal")),
                    };
                    self.skip_trivia()?;
                    self.expect(b']')?;
                    path.push(key);
                }
                _ => {
                    self.pos = checkpoint;
                    return Ok(path);
                }
            }
        }
    }

    fn object(&mut self) -> EvalResult<Value> {
        self.enter()?;
        self.pos += 1;
        let mut obj = Map::new();

        loop {
            self.skip_trivia()?;
            if self.eat(b'}') {
                break;
            }

            let key = match self.peek() {
                Some(q @ (b'"' | b'\'')) => self.string(q)?,
                Some(b'0'..=b'9') => self.number_text()?.to_string(),
                _ => {
                    let name = self
                        .peek_ident()
                        .ok_or_else(|| self.parse_error("expected property key"))?
                        .to_string();
                    self.pos += name.len();
                    name
                }
            };

            self.skip_trivia()?;
            self.expect(b':')?;
            let value = self.expr()?;
            obj.insert(key, value);

            self.skip_trivia()?;
            if self.eat(b',') {
                continue;
            }
            self.expect(b'}')?;
            break;
        }

        self.leave();
        Ok(Value::Object(obj))
    }

    fn array(&mut self) -> EvalResult<Value> {
        self.enter()?;
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.eat(b']') {
                break;
            }
            if self.eat(b',') {
                // elision
                items.push(Value::Null);
                continue;
            }

            items.push(self.expr()?);

            self.skip_trivia()?;
            if self.eat(b',') {
                continue;
            }
            self.expect(b']')?;
            break;
        }

        self.leave();
        Ok(Value::Array(items))
    }

    fn string(&mut self, quote: u8) -> EvalResult<String> {
        let (value, end) = read_string(self.src, self.pos, quote)?;
        self.pos = end;
        Ok(value)
    }

    fn number_text(&mut self) -> EvalResult<&'a str> {
        let bytes = self.src.as_bytes();
        let start = self.pos;

        if bytes[start..].starts_with(b"0x") || bytes[start..].starts_with(b"0X") {
            self.pos += 2;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
        } else {
            while self
                .peek()
                .is_some_and(|b| b.is_ascii_digit() || b == b'.' || b == b'_')
            {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                self.pos += 1;
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.pos += 1;
                }
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        if self.pos == start {
            return Err(self.parse_error("expected number"));
        }
        let src = self.src;
        Ok(&src[start..self.pos])
    }

    fn number(&mut self) -> EvalResult<Value> {
        let at = self.pos;
        let text = self.number_text()?.replace('_', "");

        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16)
                .map(|n| Value::Number(n.into()))
                .map_err(|_| self.error_at(at, "invalid hex literal"));
        }
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        text.parse::<f64>()
            .map(|f| Number::from_f64(f).map_or(Value::Null, Value::Number))
            .map_err(|_| self.error_at(at, "invalid number literal"))
    }

    fn skip_trivia(&mut self) -> EvalResult<()> {
        let bytes = self.src.as_bytes();
        loop {
            match bytes.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'/') => {
                    while bytes.get(self.pos).is_some_and(|&b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'/') if bytes.get(self.pos + 1) == Some(&b'*') => {
                    let rest = &self.src[self.pos + 2..];
                    let close = rest
                        .find("*/")
                        .ok_or_else(|| self.parse_error("unterminated comment"))?;
                    self.pos += 2 + close + 2;
                }
                _ => {
                    let rest = &self.src[self.pos..];
                    if let Some(c) = rest.chars().next().filter(|c| is_unicode_space(*c)) {
                        self.pos += c.len_utf8();
                    } else {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn peek_ident(&self) -> Option<&'a str> {
        let src = self.src;
        let rest = &src[self.pos..];
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        if !(first.is_alphabetic() || first == '_' || first == '$') {
            return None;
        }
        let end = chars
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
            .map_or(rest.len(), |(i, _)| i);
        Some(&rest[..end])
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, token: &str) -> bool {
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> EvalResult<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.parse_error(&format!("expected '{}'", byte as char)))
        }
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvaluationError::Runtime(format!(
                "nesting deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps % DEADLINE_CHECK_INTERVAL == 1 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(EvaluationError::Timeout(self.budget));
                }
            }
        }
        Ok(())
    }

    fn parse_error(&self, message: &str) -> EvaluationError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: &str) -> EvaluationError {
        EvaluationError::Parse {
            offset,
            message: message.to_string(),
        }
    }
}

fn strip_global_alias(path: &[String]) -> &[String] {
    match path.split_first() {
        Some((first, rest)) if GLOBAL_ALIASES.contains(&first.as_str()) => rest,
        _ => path,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn negate(n: &Number) -> Value {
    if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
        return Value::Number(i.into());
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .map_or(Value::Null, Value::Number)
}

fn is_unicode_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Decode a quoted script string starting at `start` (which holds the quote)
///
/// Returns the decoded text and the byte offset just past the closing quote.
pub(crate) fn read_string(src: &str, start: usize, quote: u8) -> EvalResult<(String, usize)> {
    let bytes = src.as_bytes();
    let mut out = String::new();
    let mut pos = start + 1;
    let unterminated = || EvaluationError::Parse {
        offset: start,
        message: "unterminated string".to_string(),
    };

    loop {
        let run_start = pos;
        while pos < bytes.len() && bytes[pos] != quote && bytes[pos] != b'\\' && bytes[pos] != b'\n'
        {
            pos += 1;
        }
        out.push_str(&src[run_start..pos]);

        match bytes.get(pos) {
            None | Some(b'\n') => return Err(unterminated()),
            Some(&b) if b == quote => return Ok((out, pos + 1)),
            Some(_) => {
                // backslash
                pos += 1;
                let escaped = src[pos..].chars().next().ok_or_else(unterminated)?;
                pos += escaped.len_utf8();
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    '0' if !bytes.get(pos).is_some_and(u8::is_ascii_digit) => out.push('\0'),
                    'x' => {
                        let code = parse_hex(src.get(pos..pos + 2)).ok_or_else(|| {
                            EvaluationError::Parse {
                                offset: pos,
                                message: "invalid \\x escape".to_string(),
                            }
                        })?;
                        pos += 2;
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    'u' => {
                        let (code, next) = read_unicode_escape(src, pos)?;
                        pos = next;
                        out.push(code);
                    }
                    '\r' => {
                        if bytes.get(pos) == Some(&b'\n') {
                            pos += 1;
                        }
                    }
                    '\n' | '\u{2028}' | '\u{2029}' => {}
                    other => out.push(other),
                }
            }
        }
    }
}

fn parse_hex(digits: Option<&str>) -> Option<u32> {
    let digits = digits?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Decode `XXXX` or `{X...}` after `\u`, joining surrogate pairs
fn read_unicode_escape(src: &str, pos: usize) -> EvalResult<(char, usize)> {
    let invalid = || EvaluationError::Parse {
        offset: pos,
        message: "invalid \\u escape".to_string(),
    };

    if src[pos..].starts_with('{') {
        let close = src[pos..].find('}').ok_or_else(invalid)?;
        let code = parse_hex(src.get(pos + 1..pos + close)).ok_or_else(invalid)?;
        return Ok((char::from_u32(code).unwrap_or('\u{fffd}'), pos + close + 1));
    }

    let high = parse_hex(src.get(pos..pos + 4)).ok_or_else(invalid)?;
    let next = pos + 4;

    if (0xD800..0xDC00).contains(&high) && src[next..].starts_with("\\u") {
        if let Some(low) = parse_hex(src.get(next + 2..next + 6)) {
            if (0xDC00..0xE000).contains(&low) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return Ok((char::from_u32(code).unwrap_or('\u{fffd}'), next + 6));
            }
        }
    }

    Ok((char::from_u32(high).unwrap_or('\u{fffd}'), next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GLOBALS: [&str; 2] = ["window", "Fusion"];

    fn eval(script: &str) -> Result<Value, EvaluationError> {
        LiteralEvaluator::default().evaluate(script, &GLOBALS, Duration::from_secs(5))
    }

    #[test]
    fn test_fusion_shape() {
        let script = r#"window.Fusion=window.Fusion||{};Fusion.arcSite="appledaily";
            Fusion.globalContent={"_id":"X","content_elements":[
                {"type":"raw_html","content":"<p>Hello</p>"},
                {"content":"World\r","type":"text"}
            ]};
            Fusion.globalContentConfig={'source':"content-api",count:2};"#;

        let scope = eval(script).unwrap();
        assert_eq!(scope["Fusion"]["arcSite"], "appledaily");
        assert_eq!(
            scope["Fusion"]["globalContent"]["content_elements"][1],
            json!({"content": "World\r", "type": "text"})
        );
        assert_eq!(scope["Fusion"]["globalContentConfig"]["count"], 2);
    }

    #[test]
    fn test_declarations_and_comments() {
        let script = "/* header */ var a = 1, b; // trailing\nlet c = [1, , -2.5e1, 0x1F];";
        let scope = eval(script).unwrap();
        assert_eq!(scope["a"], 1);
        assert_eq!(scope["b"], Value::Null);
        assert_eq!(scope["c"], json!([1, null, -25.0, 31]));
    }

    #[test]
    fn test_string_escapes() {
        let scope = eval(r#"var s = "a\"b\\c中\x41\n😀";"#).unwrap();
        assert_eq!(scope["s"], "a\"b\\c中A\n😀");
    }

    #[test]
    fn test_logical_operators() {
        let scope = eval("var a = null || 'x'; var b = 'y' || 'z'; var c = 1 && 0; var d = !0;").unwrap();
        assert_eq!(scope["a"], "x");
        assert_eq!(scope["b"], "y");
        assert_eq!(scope["c"], 0);
        assert_eq!(scope["d"], true);
    }

    #[test]
    fn test_member_references() {
        let scope = eval("var a = {b: ['x', 'y']}; var c = a.b[1]; var d = a['b'];").unwrap();
        assert_eq!(scope["c"], "y");
        assert_eq!(scope["d"], json!(["x", "y"]));
    }

    #[test]
    fn test_function_calls_rejected() {
        let result = eval("Fusion.x = alert(1);");
        assert!(matches!(result, Err(EvaluationError::Parse { .. })));

        let result = eval("Fusion.x = function() { while(true) {} };");
        assert!(matches!(result, Err(EvaluationError::Parse { .. })));
    }

    #[test]
    fn test_assign_through_undefined() {
        let result = eval("Missing.deep.value = 1;");
        assert!(matches!(result, Err(EvaluationError::Runtime(_))));
    }

    #[test]
    fn test_read_through_undefined() {
        let result = eval("var x = Fusion.nothing.here;");
        assert!(matches!(result, Err(EvaluationError::Runtime(_))));
    }

    #[test]
    fn test_unterminated_string() {
        let result = eval(r#"Fusion.x = "abc"#);
        assert!(matches!(result, Err(EvaluationError::Parse { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("var x = {}{};", "[".repeat(50), "]".repeat(50));
        let result = LiteralEvaluator::new(10).evaluate(&deep, &GLOBALS, Duration::from_secs(5));
        assert!(matches!(result, Err(EvaluationError::Runtime(_))));
        assert!(LiteralEvaluator::new(64)
            .evaluate(&deep, &GLOBALS, Duration::from_secs(5))
            .is_ok());
    }

    #[test]
    fn test_zero_budget_times_out() {
        let result = LiteralEvaluator::default().evaluate("var x = 1;", &GLOBALS, Duration::ZERO);
        assert_eq!(result, Err(EvaluationError::Timeout(Duration::ZERO)));
    }

    #[test]
    fn test_globals_are_bound() {
        let scope = eval("").unwrap();
        assert_eq!(scope, json!({"Fusion": {}}));
    }
}
