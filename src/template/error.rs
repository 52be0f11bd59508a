use std::path::PathBuf;

/// What went wrong in `render`. Boxed in `RenderError` to keep the
/// `Result` small; `RenderError` derefs to this.
#[derive(thiserror::Error, Debug)]
pub enum RenderErrorKind {
    #[error("wrong argument type: expected string as first parameter, got {0}")]
    WrongArgumentType(&'static str),

    #[error("failed opening {file:?} for inclusion (include_path={include_path})")]
    TemplateNotFound { file: String, include_path: String },

    #[error("model for {file:?} must be an object, got {kind}")]
    ModelNotObject { file: String, kind: &'static str },

    #[error("reading template {path:?}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("{file}:{line}: syntax error: {message}")]
    Syntax { file: String, line: usize, message: String },

    #[error("{file}:{line}: undefined variable {name:?}")]
    UndefinedVariable { file: String, line: usize, name: String },

    #[error("{file}:{line}: can't {action} a value of type {kind}")]
    Type { file: String, line: usize, action: &'static str, kind: &'static str },

    #[error("{file}:{line}: helper {helper}() failed")]
    Helper { file: String, line: usize, helper: &'static str,
             #[source] source: anyhow::Error },

    #[error("rendering {file:?} would nest renders deeper than {limit}")]
    RecursionLimit { file: String, limit: usize },

    #[error("model serialization failed")]
    Model(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct RenderError(Box<RenderErrorKind>);

impl RenderError {
    pub fn kind(&self) -> &RenderErrorKind {
        &self.0
    }

    pub fn is_not_found(&self) -> bool {
        matches!(*self.0, RenderErrorKind::TemplateNotFound { .. })
    }
}

impl std::ops::Deref for RenderError {
    type Target = RenderErrorKind;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> From<E> for RenderError where RenderErrorKind: From<E> {
    fn from(err: E) -> Self {
        RenderError(Box::new(RenderErrorKind::from(err)))
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.0, f)
    }
}

/// JSON type name for error messages.
pub fn kind_name(v: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
