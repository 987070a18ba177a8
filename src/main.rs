use clap::{Arg, Command};
use gtoken::token::{Seed, TokenAcquirer, TokenConfig, build_params, compute, translate_url};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("gtoken")
        .version("0.1.0")
        .about("Compute the tk token for the Google Translate web endpoint")
        .arg(
            Arg::new("text")
                .help("Text the token is computed for")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .short('H')
                .help("Translate front-end host (default: GTOKEN_HOST or translate.google.com)"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Use this <epoch>.<delta> seed instead of fetching one"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .short('t')
                .help("Seed refresh timeout in seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("src")
                .long("src")
                .short('s')
                .help("Source language for --url (default: auto)")
                .default_value("auto"),
        )
        .arg(
            Arg::new("dest")
                .long("dest")
                .short('d')
                .help("Destination language for --url (default: en)")
                .default_value("en"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .short('u')
                .help("Print the full translation request URL instead of the bare token")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print text, seed and token as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log seed refresh details")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let text = matches.get_one::<String>("text").unwrap();
    let src = matches.get_one::<String>("src").unwrap();
    let dest = matches.get_one::<String>("dest").unwrap();
    let verbose = matches.get_flag("verbose");

    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = TokenConfig::from_env()?;
    if let Some(host) = matches.get_one::<String>("host") {
        config = TokenConfig::new(host)?.with_timeout(config.timeout);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*secs));
    }

    let (seed, token) = match matches.get_one::<String>("seed") {
        Some(raw) => {
            let seed: Seed = raw.parse()?;
            (seed, compute(&seed, text))
        }
        None => {
            let timeout = config.timeout;
            let acquirer = TokenAcquirer::new(config.clone())?;
            let token = match acquirer.acquire_with_timeout(text, timeout).await {
                Ok(token) => token,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    if e.is_seed_unavailable() {
                        eprintln!("   Translation is temporarily unavailable; try again later");
                        eprintln!("   or pass a known seed with --seed <epoch>.<delta>");
                    }
                    return Err(e.into());
                }
            };
            (acquirer.store().snapshot().await, token)
        }
    };

    if matches.get_flag("json") {
        let output = json!({
            "text": text,
            "seed": seed,
            "token": token,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if matches.get_flag("url") {
        let params = build_params(text, src, dest, &token, &[]);
        println!("{}", translate_url(&config.base_url(), &params)?);
    } else {
        println!("{}", token);
    }

    Ok(())
}
