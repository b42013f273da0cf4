// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mint a signed token from the command line
//!
//! Development helper: signs an access (or refresh) token with the same
//! issuer the service would build from configuration, so a token minted
//! here verifies against a running instance sharing that configuration.

use std::collections::HashMap;
use std::process;

use clap::{Arg, ArgMatches, Command};
use uuid::Uuid;

use authcore::config::Config;
use authcore::token::TokenIssuer;

struct CliArgs {
    config_path: Option<String>,
    user_id: String,
    email: String,
    kind: String,
    roles: Vec<String>,
    permissions: Vec<String>,
    quiet: bool,
}

fn build_cli() -> Command {
    Command::new("mint_token")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sign an access or refresh token for development and testing")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a YAML configuration file (environment is used when absent)"),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("USER_ID")
                .help("Subject user id (a fresh UUID when absent)"),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .value_name("EMAIL")
                .help("Email claim")
                .default_value("dev@example.com"),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .value_name("TYPE")
                .help("Token type to sign")
                .value_parser(["access", "refresh"])
                .default_value("access"),
        )
        .arg(
            Arg::new("roles")
                .short('r')
                .long("roles")
                .value_name("ROLES")
                .help("Comma-separated roles (access tokens only)"),
        )
        .arg(
            Arg::new("permissions")
                .short('p')
                .long("permissions")
                .value_name("PERMISSIONS")
                .help("Comma-separated permissions (access tokens only)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress output messages, only the token is printed")
                .action(clap::ArgAction::SetTrue),
        )
}

fn split_list(matches: &ArgMatches, name: &str) -> Vec<String> {
    matches
        .get_one::<String>(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_args() -> CliArgs {
    let matches = build_cli().get_matches();
    CliArgs {
        config_path: matches.get_one::<String>("config").cloned(),
        user_id: matches
            .get_one::<String>("user")
            .cloned()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        email: matches.get_one::<String>("email").cloned().unwrap_or_default(),
        kind: matches.get_one::<String>("type").cloned().unwrap_or_default(),
        roles: split_list(&matches, "roles"),
        permissions: split_list(&matches, "permissions"),
        quiet: matches.get_flag("quiet"),
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args();
    let config = match &args.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    let issuer = TokenIssuer::from_config(&config.token);

    let session_id = Uuid::new_v4().to_string();
    let token = match args.kind.as_str() {
        "refresh" => issuer.sign_refresh(&args.user_id, &args.email, &session_id)?,
        _ => issuer.sign_access(
            &args.user_id,
            &args.email,
            &session_id,
            &args.roles,
            &args.permissions,
            &HashMap::new(),
        )?,
    };

    if args.quiet {
        print!("{token}");
    } else {
        println!("✅ Token created successfully!");
        println!("👤 User: {}", args.user_id);
        println!("📧 Email: {}", args.email);
        println!("🔖 Type: {}", args.kind);
        if !args.roles.is_empty() {
            println!("🔑 Roles: {}", args.roles.join(", "));
        }
        println!("🎫 Token: {token}");
    }
    Ok(())
}
