//! Config Session example
//!
//! Loads a candidate configuration, prints the diff against the running
//! configuration and then commits (optionally with a confirm window) or
//! discards it.
//!
//! # Usage
//!
//! ```bash
//! # Show what would change, then discard
//! cargo run --example config_session -- --host xr1 --user admin --password secret --config change.cfg
//!
//! # Commit with a 120 second confirm window
//! cargo run --example config_session -- --host xr1 --user admin --password secret \
//!     --config change.cfg --commit --confirmed 120 --comment "lab change"
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use iosxr::{CommitOptions, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== IOS-XR Config Session Example ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = Session::builder(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .danger_disable_host_key_verification();

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let Some(config) = &args.config else {
        eprintln!("Error: Must provide --config <file>");
        std::process::exit(1);
    };

    let mut session = builder.build()?;
    session.open().await?;
    println!("Connected, configuration locked: {}\n", session.is_locked());

    session.load_candidate_config_file(config).await?;

    let diff = session.compare_config().await?;
    if diff.is_empty() {
        println!("Candidate changes nothing, discarding.");
        session.discard_config().await?;
    } else {
        println!("--- Changes ---");
        println!("{}", diff);

        if args.commit {
            let mut options = CommitOptions::new();
            if let Some(comment) = &args.comment {
                options = options.comment(comment);
            }
            if let Some(seconds) = args.confirmed {
                options = options.confirmed(seconds);
            }
            session.commit_config(&options).await?;
            println!("Committed.");
        } else {
            session.discard_config().await?;
            println!("Dry run, candidate discarded.");
        }
    }

    println!("\nClosing connection...");
    session.close().await?;
    println!("Done!");

    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    config: Option<PathBuf>,
    commit: bool,
    confirmed: Option<u32>,
    comment: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = env::var("IOSXR_HOST").unwrap_or_else(|_| "localhost".to_string());
        let mut port = 22u16;
        let mut user = env::var("IOSXR_USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = env::var("IOSXR_PASSWORD").ok();
        let mut key = None;
        let mut timeout = 60u64;
        let mut config = None;
        let mut commit = false;
        let mut confirmed = None;
        let mut comment = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(60);
                    }
                }
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                }
                "--commit" => commit = true,
                "--confirmed" => {
                    i += 1;
                    if i < args.len() {
                        confirmed = args[i].parse().ok();
                    }
                }
                "--comment" => {
                    i += 1;
                    if i < args.len() {
                        comment = Some(args[i].clone());
                    }
                }
                "--help" => {
                    println!("Usage: config_session [OPTIONS]");
                    println!();
                    println!("Options:");
                    println!("  -h, --host <HOST>          Target host [env: IOSXR_HOST]");
                    println!("  -p, --port <PORT>          SSH port (default: 22)");
                    println!("  -u, --user <USER>          Username [env: IOSXR_USER]");
                    println!("  -P, --password <PASSWORD>  Password [env: IOSXR_PASSWORD]");
                    println!("  -k, --key <PATH>           Path to private key");
                    println!("  -t, --timeout <SECONDS>    Timeout (default: 60)");
                    println!("  -c, --config <FILE>        Candidate configuration to load");
                    println!("      --commit               Commit instead of discarding");
                    println!("      --confirmed <SECONDS>  Confirm window, 30-300");
                    println!("      --comment <TEXT>       Commit comment");
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            timeout,
            config,
            commit,
            confirmed,
            comment,
        }
    }
}
