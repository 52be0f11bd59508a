use std::env::VarError;
use std::ffi::OsString;
use std::fs::create_dir_all;

use anyhow::{Result, anyhow, bail, Context};

/// Get an env var as a String; decoding failures are reported as
/// errors. If the var is not set and no fallback was given, an error
/// is reported as well.
pub fn getenv_or(name: &str, fallbackvalue: Option<&str>) -> Result<String> {
    match std::env::var(name) {
        Ok(s) => Ok(s),
        Err(e) => match e {
            VarError::NotPresent =>
                match fallbackvalue {
                    Some(v) => Ok(v.to_string()),
                    None => bail!("{name:?} env var is missing and \
                                   no default provided"),
                },
            VarError::NotUnicode(_) => bail!("{name:?} env var is not unicode"),
        }
    }
}

/// Get an env var as a String; decoding failures are reported as
/// errors.
pub fn getenv(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(s) => Ok(Some(s)),
        Err(e) => match e {
            VarError::NotPresent => Ok(None),
            VarError::NotUnicode(_) => bail!("{name:?} env var is not unicode"),
        }
    }
}

/// Env var holding a list of paths (`PATH` syntax), without decoding
/// it to a String. Empty entries are dropped.
pub fn getenv_paths(name: &str) -> Option<Vec<OsString>> {
    let val = std::env::var_os(name)?;
    Some(std::env::split_paths(&val)
         .filter(|p| !p.as_os_str().is_empty())
         .map(|p| p.into_os_string())
         .collect())
}

/// Make sure `dir` exists, creating parents as needed.
pub fn ensure_dir(dir: &str) -> Result<()> {
    // XX todo: perms / umask!
    create_dir_all(dir).with_context(
        || anyhow!("can't create directory {:?}", dir))
}
