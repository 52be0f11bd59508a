use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use clap::Parser as ClapParser;

use konstrukt::apachelog::Logs;
use konstrukt::config::Config;
use konstrukt::hello::hello_component;
use konstrukt::i18n::Phrasebook;
use konstrukt::lang_en_de::Lang;
use konstrukt::registry::Registry;
use konstrukt::rouille_runner::{App, RouilleRunner};
use konstrukt::template::IncludePath;

#[derive(clap::Parser, Debug)]
/// Serve the hello demo. Further settings are taken from the env vars
/// LISTEN_HTTPS, TLSKEYSFILEBASE, PHRASEBOOK, LOGDIR and TRACE.
struct Args {
    /// Address to listen on for HTTP (overrides LISTEN_HTTP)
    #[clap(long)]
    listen: Option<String>,

    /// Template directories, `:`-separated (overrides INCLUDE_PATH)
    #[clap(long)]
    include_path: Option<String>,

    /// The name of the site, shown in the title
    #[clap(long)]
    site_name: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env()?;
    config.apply_trace();
    if let Some(listen) = args.listen {
        config.listen_http = listen;
    }
    if let Some(include_path) = &args.include_path {
        config.include_path = IncludePath::from_os_str(include_path);
    }

    let phrasebook = Arc::new(match &config.phrasebook {
        Some(path) => Phrasebook::<Lang>::load(path)?,
        None => Phrasebook::new(),
    });
    let registry = {
        let mut registry = Registry::new();
        if let Some(site_name) = args.site_name {
            registry.register("site_name", site_name);
        }
        Arc::new(registry)
    };
    let include_path = config.include_path.clone();
    eprintln!("Templates from {include_path}");

    let new_app = |logs: Mutex<Logs>| -> App<Lang> {
        let mut app = App::new(hello_component, include_path.clone());
        app.registry = registry.clone();
        app.phrasebook = phrasebook.clone();
        app.logs = logs;
        app
    };

    let http_runner = RouilleRunner::new(Arc::new(new_app(config.logs(false)?)));
    let http_thread = http_runner.run_server(
        "hello_http", config.listen_http.clone(), None)?;

    let https_thread = match config.tlskeys.take() {
        Some(tlskeys) => {
            let https_runner = RouilleRunner::new(Arc::new(new_app(config.logs(true)?)));
            Some(https_runner.run_server(
                "hello_https", config.listen_https.clone(), Some(tlskeys))?)
        }
        None => None
    };

    http_thread.join().map_err(|_| anyhow!("http thread panicked"))??;
    if let Some(https_thread) = https_thread {
        https_thread.join().map_err(|_| anyhow!("https thread panicked"))??;
    }
    Ok(())
}
