//! Evaluation of parsed templates.

use std::borrow::Cow;

use kstring::KString;
use serde_json::{Map, Value};

use crate::auri::QueryArgs;
use super::error::{RenderError, RenderErrorKind, kind_name};
use super::parse::{Expr, Helper, Node, Template};

/// What a template can call back into: the component (or the
/// standalone view) that is rendering it.
pub trait ViewHelpers {
    fn escape(&self, s: &str) -> String;

    /// Falls back to `phrase` itself.
    fn translate(&self, phrase: &str) -> String;

    fn url(&self, href: &str, args: &QueryArgs) -> anyhow::Result<String>;

    /// A nested render; `file` is not checked by the caller.
    fn render(&self, file: &Value, model: &Map<String, Value>) -> Result<String, RenderError>;
}

struct Renderer<'a> {
    tpl: &'a Template,
    helpers: &'a dyn ViewHelpers,
    model: &'a Map<String, Value>,
    /// Loop variables, innermost last
    frames: Vec<(KString, Value)>,
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.).unwrap_or(true),
        Value::String(s) => ! (s.is_empty() || s == "0"),
        Value::Array(a) => ! a.is_empty(),
        Value::Object(o) => ! o.is_empty(),
    }
}

impl<'a> Renderer<'a> {
    fn type_error(&self, line: usize, action: &'static str, v: &Value) -> RenderError {
        RenderErrorKind::Type {
            file: self.tpl.name.clone(),
            line,
            action,
            kind: kind_name(v)
        }.into()
    }

    fn printable<'v>(&self, line: usize, v: &'v Value) -> Result<Cow<'v, str>, RenderError> {
        match v {
            Value::String(s) => Ok(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Ok(Cow::Owned(n.to_string())),
            Value::Bool(true) => Ok(Cow::Borrowed("1")),
            Value::Bool(false) | Value::Null => Ok(Cow::Borrowed("")),
            Value::Array(_) | Value::Object(_) => Err(self.type_error(line, "print", v)),
        }
    }

    fn lookup(&self, line: usize, path: &[KString]) -> Result<Value, RenderError> {
        let (first, rest) = path.split_first().ok_or_else(
            || self.type_error(line, "look up", &Value::Null))?;
        let mut cur =
            match self.frames.iter().rev().find(|(k, _)| k == first) {
                Some((_, v)) => v,
                None => self.model.get(first.as_str()).ok_or_else(
                    || RenderError::from(RenderErrorKind::UndefinedVariable {
                        file: self.tpl.name.clone(),
                        line,
                        name: first.to_string(),
                    }))?
            };
        for seg in rest {
            let next = match cur {
                Value::Object(o) => o.get(seg.as_str()),
                Value::Array(a) => seg.parse::<usize>().ok().and_then(|i| a.get(i)),
                _ => None
            };
            match next {
                Some(v) => cur = v,
                None => return Ok(Value::Null)
            }
        }
        Ok(cur.clone())
    }

    /// The model as seen at this point, including loop variables.
    fn scope(&self) -> Map<String, Value> {
        let mut scope = self.model.clone();
        for (k, v) in &self.frames {
            scope.insert(k.to_string(), v.clone());
        }
        scope
    }

    fn helper_error(&self, line: usize, helper: Helper, source: anyhow::Error) -> RenderError {
        RenderErrorKind::Helper {
            file: self.tpl.name.clone(),
            line,
            helper: helper.name(),
            source
        }.into()
    }

    fn call(
        &self,
        line: usize,
        helper: Helper,
        args: &[Expr],
        named: &[(KString, Expr)],
    ) -> Result<Value, RenderError> {
        let mut positional = Vec::with_capacity(args.len());
        for a in args {
            positional.push(self.eval(line, a)?);
        }
        match helper {
            Helper::Escape | Helper::Translate => {
                let v = positional.first().unwrap_or(&Value::Null);
                let s = self.printable(line, v)?;
                Ok(Value::String(
                    if helper == Helper::Escape {
                        self.helpers.escape(&s)
                    } else {
                        self.helpers.translate(&s)
                    }))
            }
            Helper::Url => {
                let href = match positional.first() {
                    Some(v) => self.printable(line, v)?.into_owned(),
                    None => String::new(),
                };
                let mut query = QueryArgs::new();
                for (k, e) in named {
                    match self.eval(line, e)? {
                        Value::Null => query.unset(k),
                        v => {
                            let s = self.printable(line, &v)?;
                            query.set(k, &s)
                        }
                    };
                }
                self.helpers.url(&href, &query)
                    .map(Value::String)
                    .map_err(|e| self.helper_error(line, helper, e))
            }
            Helper::Render => {
                let file = positional.first().unwrap_or(&Value::Null);
                let mut model = self.scope();
                for (k, e) in named {
                    model.insert(k.to_string(), self.eval(line, e)?);
                }
                self.helpers.render(file, &model).map(Value::String)
            }
        }
    }

    fn eval(&self, line: usize, expr: &Expr) -> Result<Value, RenderError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Var(path) => self.lookup(line, path),
            Expr::Not(e) => Ok(Value::Bool(! truthy(&self.eval(line, e)?))),
            Expr::Call { helper, args, named } => self.call(line, *helper, args, named),
        }
    }

    fn nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(s) => out.push_str(s),
                Node::Print { expr, line } => {
                    let v = self.eval(*line, expr)?;
                    out.push_str(&self.printable(*line, &v)?);
                }
                Node::If { cond, line, then, otherwise } => {
                    if truthy(&self.eval(*line, cond)?) {
                        self.nodes(then, out)?;
                    } else {
                        self.nodes(otherwise, out)?;
                    }
                }
                Node::For { var, iter, line, body } => {
                    let items: Vec<Value> = match self.eval(*line, iter)? {
                        Value::Array(a) => a,
                        Value::Object(o) => o.into_iter().map(|(_, v)| v).collect(),
                        Value::Null => vec![],
                        v => return Err(self.type_error(*line, "iterate over", &v)),
                    };
                    for item in items {
                        self.frames.push((var.clone(), item));
                        let res = self.nodes(body, out);
                        self.frames.pop();
                        res?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Run `tpl` with the variables in `model`. The output is only
/// returned if rendering completes; on error nothing of it escapes.
pub fn render_template(
    tpl: &Template,
    model: &Map<String, Value>,
    helpers: &dyn ViewHelpers,
) -> Result<String, RenderError> {
    let mut out = String::new();
    let mut renderer = Renderer { tpl, helpers, model, frames: Vec::new() };
    renderer.nodes(&tpl.nodes, &mut out)?;
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Plain;

    impl ViewHelpers for Plain {
        fn escape(&self, s: &str) -> String {
            s.replace('<', "&lt;")
        }
        fn translate(&self, phrase: &str) -> String {
            if phrase == "Hello" { "Hallo".into() } else { phrase.into() }
        }
        fn url(&self, href: &str, args: &QueryArgs) -> anyhow::Result<String> {
            if href == "bad" {
                anyhow::bail!("bad href")
            }
            let q = args.to_query_string();
            Ok(if q.is_empty() { href.into() } else { format!("{href}?{q}") })
        }
        fn render(&self, file: &Value, model: &Map<String, Value>) -> Result<String, RenderError> {
            Ok(format!("[{} {}]", file, Value::Object(model.clone())))
        }
    }

    fn render(src: &str, model: Value) -> Result<String, RenderError> {
        let tpl = Template::parse("t.tpl", src)?;
        let model = match model {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        render_template(&tpl, &model, &Plain)
    }

    #[test]
    fn t_print() {
        assert_eq!(render("Hi {{ name }}!", json!({"name": "Fred"})).unwrap(), "Hi Fred!");
        assert_eq!(render("{{ e(x) }}", json!({"x": "<b>"})).unwrap(), "&lt;b>");
        assert_eq!(render("{{ __('Hello') }} {{ __('Bye') }}", json!({})).unwrap(),
                   "Hallo Bye");
        assert_eq!(render("{{ a }}|{{ b }}|{{ c }}|{{ d.e.0 }}",
                          json!({"a": 1.5, "b": true, "c": null, "d": {"e": ["z"]}}))
                   .unwrap(),
                   "1.5|1||z");
        assert_eq!(render("[{{ d.missing }}]", json!({"d": {}})).unwrap(), "[]");
    }

    #[test]
    fn t_control() {
        let src = "{% for u in users %}{% if u.admin %}*{% else %}-{% endif %}{{ u.name }} {% endfor %}";
        assert_eq!(render(src, json!({"users": [{"name": "a", "admin": true},
                                                {"name": "b", "admin": 0}]})).unwrap(),
                   "*a -b ");
        assert_eq!(render("{% if not s %}empty{% endif %}", json!({"s": "0"})).unwrap(), "empty");
        assert_eq!(render("{% for x in xs %}{{ x }}{% endfor %}", json!({"xs": null})).unwrap(), "");
        // loop variable shadows and is gone afterwards
        assert_eq!(render("{% for x in xs %}{{ x }}{% endfor %}{{ x }}",
                          json!({"xs": [1, 2], "x": 0})).unwrap(),
                   "120");
    }

    #[test]
    fn t_url_and_render() {
        assert_eq!(render("{{ url('/list', page=p, sort=null) }}", json!({"p": 2})).unwrap(),
                   "/list?page=2");
        assert_eq!(render("{% for i in [] %}{% endfor %}", json!({})).err().unwrap().to_string(),
                   "t.tpl:1: syntax error: unexpected character '['");
        assert_eq!(render("{% for x in xs %}{{ render('row.tpl', n=1) }}{% endfor %}",
                          json!({"xs": ["a"]})).unwrap(),
                   r#"["row.tpl" {"n":1,"x":"a","xs":["a"]}]"#);
    }

    #[test]
    fn t_errors() {
        let e = render("a\n{{ nope }}", json!({})).err().unwrap();
        assert_eq!(e.to_string(), "t.tpl:2: undefined variable \"nope\"");
        let e = render("{{ xs }}", json!({"xs": [1]})).err().unwrap();
        assert_eq!(e.to_string(), "t.tpl:1: can't print a value of type array");
        let e = render("{% for x in n %}{% endfor %}", json!({"n": 3})).err().unwrap();
        assert_eq!(e.to_string(), "t.tpl:1: can't iterate over a value of type number");
        let e = render("{{ url('bad') }}", json!({})).err().unwrap();
        assert_eq!(e.to_string(), "t.tpl:1: helper url() failed");
        assert!(matches!(e.kind(), RenderErrorKind::Helper { helper: "url", .. }));
    }
}
