//! Show Commands example
//!
//! Runs show commands through the XML agent, in exec and configuration
//! context, and a raw RPC.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example show_commands -- --host xr1 --user admin --password secret
//!
//! # Commands of your own, method style
//! cargo run --example show_commands -- --host xr1 --user admin --password secret \
//!     show_interfaces_brief show_bgp_summary
//! ```

use std::env;
use std::time::Duration;

use iosxr::{Session, ShowCommand};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== IOS-XR Show Commands Example ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let Some(password) = &args.password else {
        eprintln!("Error: Must provide --password or IOSXR_PASSWORD");
        std::process::exit(1);
    };

    let mut session = Session::builder(&args.host)
        .port(args.port)
        .username(&args.user)
        .password(password)
        .timeout(Duration::from_secs(args.timeout))
        .lock_on_open(false)
        .danger_disable_host_key_verification()
        .build()?;

    session.open().await?;
    println!("Connected! Prompt: {}\n", session.cli_prompt());

    let commands = if args.commands.is_empty() {
        vec![
            ShowCommand::parse("show_version"),
            ShowCommand::parse("show_interfaces_brief"),
            ShowCommand::parse("show_configuration_commit_list")
                .arg("5")
                .configuration(),
            ShowCommand::parse("show_running-config").arg("hostname"),
        ]
    } else {
        args.commands.iter().map(|c| ShowCommand::parse(c)).collect()
    };

    for command in &commands {
        println!("--- {} ({:?}) ---", command, command.context());
        match session.show(command).await {
            Ok(output) => println!("{}", output),
            Err(e) => println!("Error: {}", e),
        }
        println!();
    }

    println!("--- Raw RPC: platform inventory ---");
    let inventory = session
        .make_rpc_call("<Get><Operational><Inventory/></Operational></Get>")
        .await?;
    println!("{} bytes of XML", inventory.len());

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
    timeout: u64,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = env::var("IOSXR_HOST").unwrap_or_else(|_| "localhost".to_string());
        let mut port = 22u16;
        let mut user = env::var("IOSXR_USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = env::var("IOSXR_PASSWORD").ok();
        let mut timeout = 60u64;
        let mut commands = Vec::new();

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
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(60);
                    }
                }
                other if !other.starts_with('-') => commands.push(other.to_string()),
                _ => {}
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            timeout,
            commands,
        }
    }
}
