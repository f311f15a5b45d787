use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use footy_terminal::api_client::ApiClient;
use footy_terminal::config::{default_db_path, ApiConfig};
use footy_terminal::dispatch::{Dispatcher, Session};
use footy_terminal::format;
use footy_terminal::parser::QueryParser;
use footy_terminal::resolver::IdentityStore;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = ApiConfig::from_env()?;
    let store = match default_db_path() {
        Some(path) => IdentityStore::open(&path)
            .with_context(|| format!("open identity store at {}", path.display()))?,
        None => IdentityStore::open_in_memory().context("open fallback identity store")?,
    };
    let api = ApiClient::new(&config).context("build stats client")?;
    let parser = QueryParser::new(&config);

    let mut dispatcher = Dispatcher::new(&api, &store);
    let mut session = Session::new();

    println!("Welcome to Footy Terminal ⚽  (type 'quit' to exit)");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("read input")? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let reply = dispatcher.handle_turn(&mut session, line, |text| {
            parser.parse_user_prompt(text)
        });
        println!("{}", format::render(&reply));
    }

    Ok(())
}
