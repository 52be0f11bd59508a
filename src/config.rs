//! Server configuration from environment variables.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use anyhow::{Result, Context, anyhow};

use crate::apachelog::Logs;
use crate::rouille_runner::Tlskeys;
use crate::template::IncludePath;
use crate::util::{ensure_dir, getenv, getenv_or, getenv_paths};
use crate::warn::DO_TRACE;

pub struct Config {
    /// `LISTEN_HTTP`
    pub listen_http: String,
    /// `LISTEN_HTTPS`, only used if `tlskeys` are given
    pub listen_https: String,
    /// From `$TLSKEYSFILEBASE.crt` and `$TLSKEYSFILEBASE.key`
    pub tlskeys: Option<Tlskeys>,
    /// `INCLUDE_PATH`
    pub include_path: IncludePath,
    /// `PHRASEBOOK`
    pub phrasebook: Option<PathBuf>,
    /// `LOGDIR`; stderr if not given
    pub logdir: Option<String>,
    /// `TRACE`
    pub trace: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tlskeys = getenv("TLSKEYSFILEBASE")?.map(
            |base| -> Result<_> {
                let read = |path: String| std::fs::read(&path).with_context(
                    || anyhow!("reading TLS key file {path:?}"));
                Ok(Tlskeys {
                    crt: read(format!("{base}.crt"))?,
                    key: read(format!("{base}.key"))?,
                })
            }).transpose()?;
        Ok(Config {
            listen_http: getenv_or("LISTEN_HTTP", Some("127.0.0.1:3000"))?,
            listen_https: getenv_or("LISTEN_HTTPS", Some("127.0.0.1:3001"))?,
            tlskeys,
            include_path: match getenv_paths("INCLUDE_PATH") {
                Some(dirs) => IncludePath::new(dirs),
                None => IncludePath::new(["templates"]),
            },
            phrasebook: getenv("PHRASEBOOK")?.map(PathBuf::from),
            logdir: getenv("LOGDIR")?,
            trace: getenv("TRACE")?.is_some(),
        })
    }

    /// Switch `trace!` output on if configured.
    pub fn apply_trace(&self) {
        if self.trace {
            DO_TRACE.store(true, Ordering::SeqCst);
        }
    }

    pub fn logs(&self, is_https: bool) -> Result<Mutex<Logs>> {
        match &self.logdir {
            Some(dir) => {
                ensure_dir(dir)?;
                Logs::open_in_basedir(dir, is_https)
            }
            None => Ok(Logs::stderr())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // The only test touching these env vars.
    #[test]
    fn t_from_env() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("k.crt"), "CRT")?;
        std::fs::write(dir.path().join("k.key"), "KEY")?;
        std::env::set_var("LISTEN_HTTP", "0.0.0.0:8080");
        std::env::set_var("INCLUDE_PATH", "a:b");
        std::env::set_var("TLSKEYSFILEBASE", dir.path().join("k"));
        std::env::set_var("LOGDIR", dir.path().join("logs"));
        std::env::remove_var("PHRASEBOOK");
        let config = Config::from_env()?;
        assert_eq!(config.listen_http, "0.0.0.0:8080");
        assert_eq!(config.include_path.to_string(), "a:b");
        assert_eq!(config.tlskeys.as_ref().map(|k| k.key.as_slice()), Some(&b"KEY"[..]));
        assert!(config.phrasebook.is_none());
        config.logs(false)?;
        assert!(dir.path().join("logs/http_access.log").exists());

        std::env::set_var("TLSKEYSFILEBASE", dir.path().join("missing"));
        assert!(Config::from_env().is_err());
        for var in ["LISTEN_HTTP", "INCLUDE_PATH", "TLSKEYSFILEBASE", "LOGDIR"] {
            std::env::remove_var(var);
        }
        Ok(())
    }
}
