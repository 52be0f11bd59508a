//! Parser for procedural view templates.

//! ```text
//! text {{ expr }} {# comment #}
//! {% if expr %} .. {% else %} .. {% endif %}
//! {% for name in expr %} .. {% endfor %}
//! ```
//! Expressions: `"string"`, numbers, `true`, `false`, `null`,
//! variable paths `a.b.0`, `not expr`, and the helper calls `e(x)`,
//! `__(x)`, `url(href, key=expr, ..)`, `render(file, key=expr, ..)`.
//! Strings may contain the closing `}}` or `%}` of their tag.

use kstring::KString;
use serde_json::{Value, Number};

use super::error::{RenderError, RenderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    /// `e`: escape with the output filters
    Escape,
    /// `__`: translate
    Translate,
    Url,
    Render,
}

impl Helper {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "e" => Some(Helper::Escape),
            "__" => Some(Helper::Translate),
            "url" => Some(Helper::Url),
            "render" => Some(Helper::Render),
            _ => None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Helper::Escape => "e",
            Helper::Translate => "__",
            Helper::Url => "url",
            Helper::Render => "render",
        }
    }

    /// (min, max) positional arguments, and whether named ones are allowed
    fn arity(self) -> (usize, usize, bool) {
        match self {
            Helper::Escape => (1, 1, false),
            Helper::Translate => (1, 1, false),
            Helper::Url => (0, 1, true),
            Helper::Render => (1, 1, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(Vec<KString>),
    Not(Box<Expr>),
    Call {
        helper: Helper,
        args: Vec<Expr>,
        named: Vec<(KString, Expr)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Print { expr: Expr, line: usize },
    If { cond: Expr, line: usize, then: Vec<Node>, otherwise: Vec<Node> },
    For { var: KString, iter: Expr, line: usize, body: Vec<Node> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// As passed to `render`, for error messages
    pub name: String,
    pub nodes: Vec<Node>,
}

fn syntax_error(file: &str, line: usize, message: String) -> RenderError {
    RenderErrorKind::Syntax { file: file.into(), line, message }.into()
}

// ------------------------------------------------------------------
// Tags

#[derive(Debug, PartialEq)]
enum Token<'s> {
    Text(&'s str),
    Print(&'s str, usize),
    Block(&'s str, usize),
}

/// Position of `closer` in `s`, skipping over quoted strings. If a
/// quote is left open, the first `closer` anywhere, so that the
/// expression lexer gets to report the unterminated string.
fn find_closer(s: &str, closer: &str) -> Option<usize> {
    let mut quote = None;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) => match c {
                '\\' => { chars.next(); }
                c if c == q => quote = None,
                _ => (),
            },
            None => match c {
                '"' | '\'' => quote = Some(c),
                _ if s[i..].starts_with(closer) => return Some(i),
                _ => (),
            }
        }
    }
    s.find(closer)
}

/// Position of the next `{{`, `{%` or `{#`, and the closer for it.
fn find_tag_start(s: &str) -> Option<(usize, u8, &'static str)> {
    let bytes = s.as_bytes();
    let mut search = 0;
    while let Some(j) = s[search..].find('{') {
        let i = search + j;
        match bytes.get(i + 1) {
            Some(b'{') => return Some((i, b'{', "}}")),
            Some(b'%') => return Some((i, b'%', "%}")),
            Some(b'#') => return Some((i, b'#', "#}")),
            _ => search = i + 1,
        }
    }
    None
}

fn tokenize<'s>(file: &str, src: &'s str) -> Result<Vec<Token<'s>>, RenderError> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    // Line number at `offset`
    let mut line = 1;
    loop {
        let rest = &src[offset..];
        match find_tag_start(rest) {
            None => {
                if ! rest.is_empty() {
                    tokens.push(Token::Text(rest));
                }
                return Ok(tokens)
            }
            Some((i, kind, closer)) => {
                if i > 0 {
                    tokens.push(Token::Text(&rest[..i]));
                }
                line += rest[..i].matches('\n').count();
                let inner_start = i + 2;
                let len =
                    if kind == b'#' {
                        rest[inner_start..].find(closer)
                    } else {
                        find_closer(&rest[inner_start..], closer)
                    }.ok_or_else(
                        || syntax_error(file, line, format!("missing {closer:?}")))?;
                let inner = rest[inner_start..inner_start + len].trim();
                match kind {
                    b'{' => tokens.push(Token::Print(inner, line)),
                    b'%' => tokens.push(Token::Block(inner, line)),
                    _ => (), // comment
                }
                let end = inner_start + len + closer.len();
                line += rest[i..end].matches('\n').count();
                offset += end;
            }
        }
    }
}

// ------------------------------------------------------------------
// Expressions

#[derive(Debug, Clone, PartialEq)]
enum ETok<'s> {
    Str(String),
    Num(Number),
    Ident(&'s str),
    Dot,
    Comma,
    LParen,
    RParen,
    Eq,
    Bang,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex_expr<'s>(s: &'s str) -> Result<Vec<ETok<'s>>, String> {
    let mut toks = Vec::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => (),
            '.' => toks.push(ETok::Dot),
            ',' => toks.push(ETok::Comma),
            '(' => toks.push(ETok::LParen),
            ')' => toks.push(ETok::RParen),
            '=' => toks.push(ETok::Eq),
            '!' => toks.push(ETok::Bang),
            '"' | '\'' => {
                let quote = c;
                let mut val = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, 'n')) => val.push('\n'),
                            Some((_, 't')) => val.push('\t'),
                            Some((_, c)) => val.push(c),
                            None => break,
                        },
                        c if c == quote => { closed = true; break }
                        c => val.push(c),
                    }
                }
                if ! closed {
                    return Err(format!("unterminated string starting at column {}", i + 1))
                }
                toks.push(ETok::Str(val));
            }
            c if c.is_ascii_digit() || c == '-' => {
                // After a dot only integers, since `a.0.1` is a path
                let after_dot = toks.last() == Some(&ETok::Dot);
                let mut end = i + c.len_utf8();
                let mut seen_point = false;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = j + 1;
                        chars.next();
                    } else if d == '.' && !seen_point && !after_dot
                        && s[j + 1..].starts_with(|c: char| c.is_ascii_digit())
                    {
                        seen_point = true;
                        end = j + 1;
                        chars.next();
                    } else {
                        break
                    }
                }
                let numstr = &s[i..end];
                let num = if seen_point {
                    numstr.parse::<f64>().ok().and_then(Number::from_f64)
                } else {
                    numstr.parse::<i64>().ok().map(Number::from)
                };
                toks.push(ETok::Num(num.ok_or_else(
                    || format!("invalid number {numstr:?}"))?));
            }
            c if is_ident_start(c) => {
                let mut end = i + 1;
                while let Some(&(j, d)) = chars.peek() {
                    if is_ident_char(d) {
                        end = j + 1;
                        chars.next();
                    } else {
                        break
                    }
                }
                toks.push(ETok::Ident(&s[i..end]));
            }
            c => return Err(format!("unexpected character {c:?}"))
        }
    }
    Ok(toks)
}

struct ExprParser<'t, 's> {
    toks: &'t [ETok<'s>],
    pos: usize,
}

impl<'t, 's> ExprParser<'t, 's> {
    fn peek(&self) -> Option<&'t ETok<'s>> {
        self.toks.get(self.pos)
    }

    fn peek2(&self) -> Option<&'t ETok<'s>> {
        self.toks.get(self.pos + 1)
    }

    fn next(&mut self) -> Option<&'t ETok<'s>> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expr(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(ETok::Bang) | Some(ETok::Ident("not")) => {
                self.next();
                Ok(Expr::Not(Box::new(self.expr()?)))
            }
            _ => self.primary()
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(ETok::Str(s)) => Ok(Expr::Literal(Value::String(s.clone()))),
            Some(ETok::Num(n)) => Ok(Expr::Literal(Value::Number(n.clone()))),
            Some(ETok::Ident("true")) => Ok(Expr::Literal(Value::Bool(true))),
            Some(ETok::Ident("false")) => Ok(Expr::Literal(Value::Bool(false))),
            Some(ETok::Ident("null")) => Ok(Expr::Literal(Value::Null)),
            Some(ETok::Ident(name)) => {
                if self.peek() == Some(&ETok::LParen) {
                    self.next();
                    self.call(name)
                } else {
                    self.path(name)
                }
            }
            Some(t) => Err(format!("unexpected {t:?}")),
            None => Err("empty expression".into()),
        }
    }

    fn path(&mut self, first: &str) -> Result<Expr, String> {
        let mut path = vec![KString::from_ref(first)];
        while self.peek() == Some(&ETok::Dot) {
            self.next();
            match self.next() {
                Some(ETok::Ident(seg)) => path.push(KString::from_ref(seg)),
                Some(ETok::Num(n)) if n.is_u64() =>
                    path.push(KString::from_string(n.to_string())),
                _ => return Err(format!("expected member name after {:?}",
                                        itertools::join(&path, ".")))
            }
        }
        Ok(Expr::Var(path))
    }

    fn call(&mut self, name: &str) -> Result<Expr, String> {
        let helper = Helper::from_name(name).ok_or_else(
            || format!("unknown helper {name:?}"))?;
        let mut args = Vec::new();
        let mut named = Vec::new();
        if self.peek() == Some(&ETok::RParen) {
            self.next();
        } else {
            loop {
                match (self.peek(), self.peek2()) {
                    (Some(ETok::Ident(key)), Some(ETok::Eq)) => {
                        self.pos += 2;
                        named.push((KString::from_ref(key), self.expr()?));
                    }
                    _ => {
                        if ! named.is_empty() {
                            return Err(format!(
                                "{name}(): positional argument after named argument"))
                        }
                        args.push(self.expr()?);
                    }
                }
                match self.next() {
                    Some(ETok::Comma) => (),
                    Some(ETok::RParen) => break,
                    Some(t) => return Err(format!("expected ',' or ')', got {t:?}")),
                    None => return Err(format!("{name}(): missing ')'")),
                }
            }
        }
        let (min, max, allows_named) = helper.arity();
        if args.len() < min || args.len() > max {
            return Err(format!("{name}() takes {} argument{}, got {}",
                               if min == max { min.to_string() }
                               else { format!("{min} to {max}") },
                               if max == 1 { "" } else { "s" },
                               args.len()))
        }
        if ! allows_named && ! named.is_empty() {
            return Err(format!("{name}() takes no named arguments"))
        }
        Ok(Expr::Call { helper, args, named })
    }
}

fn parse_expr(file: &str, line: usize, s: &str) -> Result<Expr, RenderError> {
    let toks = lex_expr(s).map_err(|m| syntax_error(file, line, m))?;
    let mut p = ExprParser { toks: &toks, pos: 0 };
    let expr = p.expr().map_err(|m| syntax_error(file, line, m))?;
    if let Some(t) = p.peek() {
        return Err(syntax_error(file, line, format!("unexpected {t:?} after expression")))
    }
    Ok(expr)
}

// ------------------------------------------------------------------
// Tree

struct TreeBuilder<'t, 's> {
    file: &'t str,
    tokens: &'t [Token<'s>],
    pos: usize,
}

impl<'t, 's> TreeBuilder<'t, 's> {
    /// Collect nodes until one of `closers` (or the end if `closers`
    /// is empty). Returns which closer was hit.
    fn nodes(
        &mut self,
        closers: &[&'static str],
        opened: Option<(&str, usize)>,
    ) -> Result<(Vec<Node>, Option<&'static str>), RenderError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            match *token {
                Token::Text(s) => nodes.push(Node::Text(s.into())),
                Token::Print(s, line) =>
                    nodes.push(Node::Print { expr: parse_expr(self.file, line, s)?, line }),
                Token::Block(s, line) => {
                    let (keyword, rest) = s.split_once(char::is_whitespace)
                        .map(|(k, r)| (k, r.trim()))
                        .unwrap_or((s, ""));
                    if let Some(closer) = closers.iter().find(|c| **c == keyword) {
                        if ! rest.is_empty() {
                            return Err(syntax_error(self.file, line,
                                                    format!("{keyword} takes no arguments")))
                        }
                        return Ok((nodes, Some(*closer)))
                    }
                    match keyword {
                        "if" => nodes.push(self.if_node(rest, line)?),
                        "for" => nodes.push(self.for_node(rest, line)?),
                        "else" | "endif" | "endfor" =>
                            return Err(syntax_error(self.file, line,
                                                    format!("unexpected {{% {keyword} %}}"))),
                        _ =>
                            return Err(syntax_error(self.file, line,
                                                    format!("unknown tag {keyword:?}"))),
                    }
                }
            }
        }
        if let Some((what, line)) = opened {
            return Err(syntax_error(self.file, line, format!("unclosed {{% {what} %}}")))
        }
        Ok((nodes, None))
    }

    fn if_node(&mut self, cond: &str, line: usize) -> Result<Node, RenderError> {
        let cond = parse_expr(self.file, line, cond)?;
        let (then, closer) = self.nodes(&["else", "endif"], Some(("if", line)))?;
        let otherwise =
            if closer == Some("else") {
                self.nodes(&["endif"], Some(("if", line)))?.0
            } else {
                Vec::new()
            };
        Ok(Node::If { cond, line, then, otherwise })
    }

    fn for_node(&mut self, rest: &str, line: usize) -> Result<Node, RenderError> {
        let malformed = || syntax_error(self.file, line,
                                        format!("expecting `for name in expr`, got {rest:?}"));
        let (var, rest) = rest.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let iter = rest.trim_start().strip_prefix("in")
            .filter(|r| r.starts_with(char::is_whitespace))
            .ok_or_else(malformed)?;
        if var.is_empty() || ! var.starts_with(is_ident_start) || ! var.chars().all(is_ident_char) {
            return Err(malformed())
        }
        let iter = parse_expr(self.file, line, iter)?;
        let (body, _) = self.nodes(&["endfor"], Some(("for", line)))?;
        Ok(Node::For { var: KString::from_ref(var), iter, line, body })
    }
}

impl Template {
    pub fn parse(name: &str, src: &str) -> Result<Template, RenderError> {
        let tokens = tokenize(name, src)?;
        let mut builder = TreeBuilder { file: name, tokens: &tokens, pos: 0 };
        let (nodes, _) = builder.nodes(&[], None)?;
        Ok(Template { name: name.into(), nodes })
    }
}
