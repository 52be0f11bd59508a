//! Procedural view templates: locating them on the include path,
//! parsing and rendering them into a string.

pub mod error;
pub mod include_path;
pub mod parse;
pub mod render;

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

pub use error::{RenderError, RenderErrorKind};
pub use include_path::IncludePath;
pub use parse::Template;
pub use render::{ViewHelpers, render_template};

use crate::trace;
use error::kind_name;

impl Template {
    /// Read and parse the file at `path`; `name` is used in error
    /// messages.
    pub fn load(path: &Path, name: &str) -> Result<Template, RenderError> {
        let src = std::fs::read_to_string(path).map_err(
            |source| RenderErrorKind::Io { path: path.into(), source })?;
        Template::parse(name, &src)
    }
}

/// Convert a model to the variables of a template. `()` and other
/// values serializing to null give no variables.
pub fn model_map<M: Serialize + ?Sized>(
    file: &str,
    model: &M,
) -> Result<Map<String, Value>, RenderError> {
    match serde_json::to_value(model)? {
        Value::Object(m) => Ok(m),
        Value::Null => Ok(Map::new()),
        other => Err(RenderErrorKind::ModelNotObject {
            file: file.into(),
            kind: kind_name(&other)
        }.into())
    }
}

/// The file name in `file`, or `WrongArgumentType` if it isn't a
/// string.
pub fn file_name(file: &Value) -> Result<&str, RenderError> {
    match file {
        Value::String(s) => Ok(s.as_str()),
        other => Err(RenderErrorKind::WrongArgumentType(kind_name(other)).into())
    }
}

/// Locate `file` on `include_path`, load it and render it with
/// `model`.
pub fn render_file(
    include_path: &IncludePath,
    file: &str,
    model: &Map<String, Value>,
    helpers: &dyn ViewHelpers,
) -> Result<String, RenderError> {
    let path = include_path.search(file).ok_or_else(
        || RenderErrorKind::TemplateNotFound {
            file: file.into(),
            include_path: include_path.to_string()
        })?;
    trace!("render: {file:?} is {path:?}");
    let tpl = Template::load(&path, file)?;
    render_template(&tpl, model, helpers)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::auri::QueryArgs;
    use serde_json::json;

    struct Nothing;

    impl ViewHelpers for Nothing {
        fn escape(&self, s: &str) -> String { s.into() }
        fn translate(&self, phrase: &str) -> String { phrase.into() }
        fn url(&self, href: &str, _args: &QueryArgs) -> anyhow::Result<String> {
            Ok(href.into())
        }
        fn render(&self, _file: &Value, _model: &Map<String, Value>)
                  -> Result<String, RenderError> {
            Ok(String::new())
        }
    }

    #[test]
    fn t_model_map() {
        #[derive(Serialize)]
        struct Page<'t> { title: &'t str }
        assert_eq!(model_map("a", &Page { title: "x" }).unwrap()["title"], json!("x"));
        assert!(model_map("a", &()).unwrap().is_empty());
        assert_eq!(model_map("a", &[1, 2]).err().unwrap().to_string(),
                   "model for \"a\" must be an object, got array");
    }

    #[test]
    fn t_file_name() {
        assert_eq!(file_name(&json!("a.tpl")).unwrap(), "a.tpl");
        let e = file_name(&json!(42)).err().unwrap();
        assert_eq!(e.to_string(),
                   "wrong argument type: expected string as first parameter, got number");
    }

    #[test]
    fn t_render_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("hi.tpl"), "Hi {{ who }}")?;
        let ip = IncludePath::new([dir.path()]);
        let model = model_map("hi.tpl", &json!({"who": "you"}))?;
        assert_eq!(render_file(&ip, "hi.tpl", &model, &Nothing)?, "Hi you");
        let e = render_file(&ip, "nope.tpl", &model, &Nothing).err().unwrap();
        assert!(e.is_not_found());
        assert_eq!(e.to_string(),
                   format!("failed opening \"nope.tpl\" for inclusion (include_path={})",
                           dir.path().display()));
        Ok(())
    }
}
