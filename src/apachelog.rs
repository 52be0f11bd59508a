//! Write HTTP access log files in the Combined Log Format (extended
//! Common Log Format) for access logs (Apache style), as per
//! <https://httpd.apache.org/docs/2.4/logs.html>.

use std::fs::File;
use std::io::{stderr, BufWriter, Write};
use std::mem::swap;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, Instant};

use anyhow::{Result, Context, anyhow};
use chrono::{DateTime, Utc, Datelike, Timelike};
use rouille::{Response, ResponseBody};

use crate::context::RequestContext;
use crate::http_response_status_codes::HttpResponseStatusCode;
use crate::language::Language;
use crate::warn;

static MONTHS: &[&str; 12] = &["Jan", "Feb", "Mar", "Apr", "May", "Jun",
                               "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

// "06/Dec/2023:02:02:47 +0000"
pub fn write_time(
    outp: &mut impl Write,
    time: SystemTime
) -> Result<()> {
    let dt: DateTime<Utc> = DateTime::from(time);
    write!(outp, "{:02}/{}/{:04}:{:02}:{:02}:{:02} +0000",
           dt.day(), MONTHS[dt.month0() as usize], dt.year(),
           dt.hour(), dt.minute(), dt.second())?;
    Ok(())
}

// Apache:
// 44.212.94.18 - - [06/Dec/2023:02:38:18 +0100] "GET /resume/nontechnical.html HTTP/1.1" 200 2403 "-" "CCBot/2.0 (https://commoncrawl.org/faq/)"
// We also add duration at the end.

/// Write to access.log
pub fn write_combined<L: Language>(
    outp: &mut impl Write,
    context: &RequestContext<L>,
    duration: Duration,
    response: &mut Response, // temporarily swaps out ResponseBody and back
) -> Result<()> {
    // Write the time when the log entry is made, not when the
    // request started
    let now = SystemTime::now();
    write!(outp, "{} - - [", context.client_ip())?;
    write_time(outp, now)?;
    let len = {
        // The body length is private, with no accessor; take the
        // body apart and put it back together.
        let mut responsebody = ResponseBody::empty();
        swap(&mut responsebody, &mut response.data);
        let (data, length) = responsebody.into_reader_and_size();
        responsebody =
            if let Some(len) = length {
                ResponseBody::from_reader_and_size(data, len)
            } else {
                ResponseBody::from_reader(data)
            };
        swap(&mut responsebody, &mut response.data);
        length
    };
    writeln!(outp, "] {:?} {} {} {:?} {:?} {duration:?}",
             context.request_line(),
             response.status_code,
             len.unwrap_or(0),
             context.referer().unwrap_or("-"),
             context.user_agent().unwrap_or("-"))?;
    outp.flush()?;
    Ok(())
}

/// Write to error.log
pub fn write_error<L: Language>(
    outp: &mut impl Write,
    context: &RequestContext<L>,
    duration: Duration,
    err: &anyhow::Error,
) -> Result<()> {
    let now = SystemTime::now();
    write!(outp, "[")?;
    write_time(outp, now)?;
    writeln!(outp, "] [error] [client {}] {:?} {duration:?}: {err:#}",
             context.client_ip(),
             context.request_line())?;
    outp.flush()?;
    Ok(())
}

/// Panic log to stderr.
fn write_panic_stderr<L: Language>(
    context: &RequestContext<L>,
    duration: Duration
) {
    let result = (|| -> std::io::Result<()> {
        let mut outp = BufWriter::new(stderr().lock());
        // stderr is fed to a service like daemontools which adds
        // timestamps, hence none here.
        writeln!(&mut outp, "[panic] handling {:?} after {duration:?}",
                 context.request_line())?;
        outp.flush()
    })();
    if let Err(e) = result {
        warn!("could not write panic log: {e}");
    }
}


fn open_log_output(path: PathBuf) -> Result<Box<dyn Write + Send + Sync>> {
    let mut outp = File::options();
    outp.write(true).append(true).create(true);
    if let Some(parent) = path.parent() {
        let _ignore = std::fs::create_dir_all(parent);
    }
    Ok(Box::new(BufWriter::new(outp.open(&path).with_context(
        || anyhow!("opening log for output: {:?}", path.to_string_lossy()))?)))
}

/// The log files to write to, either access_log if a response was
/// made, or error log when the handler failed. Should do buffering
/// (i.e. be BufWriter), the code calls flush once per entry.
pub struct Logs {
    pub access_log: Box<dyn Write + Send + Sync>,
    pub error_log: Box<dyn Write + Send + Sync>,
}

impl Logs {
    pub fn open_in_basedir(
        logbasedir: &str,
        is_https: bool
    ) -> Result<Mutex<Logs>>
    {
        let s = if is_https { "s" } else { "" };
        Ok(Mutex::new(Logs {
            access_log: open_log_output(
                format!("{logbasedir}/http{s}_access.log").into())?,
            error_log: open_log_output(
                format!("{logbasedir}/http{s}_error.log").into())?,
        }))
    }

    /// Both logs to stderr.
    pub fn stderr() -> Mutex<Logs> {
        Mutex::new(Logs {
            access_log: Box::new(stderr()),
            error_log: Box::new(stderr()),
        })
    }

    /// Discard everything (tests).
    pub fn sink() -> Mutex<Logs> {
        Mutex::new(Logs {
            access_log: Box::new(std::io::sink()),
            error_log: Box::new(std::io::sink()),
        })
    }
}


/// Run `handler`, logging its outcome to `logs`. On error the
/// response is `errorpage(500)`. Panics are logged and resumed.
pub fn log_combined<L: Language, F>(
    context: &RequestContext<L>,
    logs: &Mutex<Logs>,
    errorpage: &dyn Fn(HttpResponseStatusCode) -> Response,
    handler: F
) -> Response
where
    F: FnOnce() -> Result<Response>,
{
    let start_instant = Instant::now();

    // Call the handler and catch panics; we always resume unwinding
    // afterwards.
    let result = panic::catch_unwind(panic::AssertUnwindSafe(handler));
    let elapsed = start_instant.elapsed();

    // If `write` panicked while holding the lock the logs may be
    // garbled, but are still usable.
    let lock = || logs.lock().unwrap_or_else(|e| e.into_inner());

    match result {
        Ok(Ok(mut response)) => {
            if let Err(e) = write_combined(&mut lock().access_log, context, elapsed,
                                           &mut response) {
                warn!("could not write to access log: {e:#}")
            }
            response
        }
        Ok(Err(err)) => {
            if let Err(e) = write_error(&mut lock().error_log, context, elapsed, &err) {
                warn!("could not write to error log: {e:#}")
            }
            errorpage(HttpResponseStatusCode::InternalServerError500)
        }
        Err(payload) => {
            write_panic_stderr(context, elapsed);
            // The panic handler will print the payload contents
            panic::resume_unwind(payload);
        }
    }
}
