//! Printing warnings and trace output to stderr.

use std::sync::atomic::AtomicBool;

/// Switch for `trace!`. Set from the `TRACE` env var by
/// `Config::from_env`, or directly via
/// `konstrukt::warn::DO_TRACE.store(true, Ordering::SeqCst)`.
pub static DO_TRACE: AtomicBool = AtomicBool::new(false);

#[macro_export]
macro_rules! warn {
    ($formatstr:expr $(,$arg:expr)*) => { {
        use std::io::Write;
        let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
        let _ = write!(&mut outp, "W: ");
        let _ = write!(&mut outp, $formatstr $(,$arg)*);
        let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
        let _ = outp.flush();
    } }
}

/// Like `warn!` but only prints when `DO_TRACE` is set, and prefixes
/// the thread id since requests are served from a thread pool.
#[macro_export]
macro_rules! trace {
    { $fmt:expr $(,$arg:expr)* } => {
        if $crate::warn::DO_TRACE.load(std::sync::atomic::Ordering::SeqCst) {
            use std::io::Write;
            let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
            let _ = write!(&mut outp, "{:?} T: ", std::thread::current().id());
            let _ = write!(&mut outp, $fmt $(,$arg)*);
            let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
            let _ = outp.flush();
        }
    }
}
