//! `deskauth` command-line front end.
//!
//! Run with: `deskauth <command>`
//!
//! Configuration comes from `DESKAUTH_*` environment variables (a `.env`
//! file in the working directory is honored) or from a `deskauth.{json,toml}`
//! file. Output is for people, so `println!` / `eprintln!` are used for it
//! and structured logs go to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context};
use deskauth_common::auth::TokenSet;
use deskauth_domain::AuthError;
use deskauth_infra::{config, Authenticator};

mod logging;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let started = Instant::now();

    let result = match command {
        Some("login") => run_login(&args[1..]).await,
        Some("logout") => run_logout(),
        Some("status") => run_status(),
        Some("help" | "--help" | "-h") | None => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Some(unknown) => {
            eprintln!("Unknown command: {unknown}");
            eprintln!();
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let command = command.unwrap_or_default();
    let auth_error = result.as_ref().err().and_then(|e| e.downcast_ref::<AuthError>());
    logging::log_command_outcome(command, started.elapsed(), auth_error);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{command} failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("DeskAuth - desktop sign-in for Azure AD B2C");
    println!();
    println!("USAGE:");
    println!("    deskauth <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    login [SCOPE...]  Sign in, silently if a cached token allows it");
    println!("    logout            Delete the cached tokens");
    println!("    status            Show the cached account without contacting the tenant");
    println!("    help              Show this help message");
}

fn authenticator() -> anyhow::Result<Authenticator> {
    let config = config::load().context("failed to load configuration")?;
    Authenticator::from_config(&config).context("failed to initialize sign-in")
}

async fn run_login(scopes: &[String]) -> anyhow::Result<()> {
    let auth = authenticator()?;
    let tokens = auth.authenticate(scopes).await?;
    print_session("Signed in", &tokens);
    Ok(())
}

fn run_logout() -> anyhow::Result<()> {
    authenticator()?.logout()?;
    println!("Signed out");
    Ok(())
}

fn run_status() -> anyhow::Result<()> {
    let auth = authenticator()?;
    let Some(tokens) = auth.cached_tokens() else {
        println!("Not signed in");
        return Ok(());
    };

    if tokens.is_expired(0) && tokens.refresh_token.is_none() {
        bail!("cached session has expired; run `deskauth login`");
    }
    print_session("Cached session", &tokens);
    Ok(())
}

fn print_session(heading: &str, tokens: &TokenSet) {
    match &tokens.account {
        Some(account) => println!("{heading} as {account}"),
        None => println!("{heading}"),
    }

    let remaining = tokens.seconds_until_expiry();
    if remaining > 0 {
        println!("  token expires in {remaining}s");
    } else {
        println!("  token expired {}s ago (renewable)", -remaining);
    }
    if !tokens.scopes.is_empty() {
        println!("  scopes: {}", tokens.scope_string());
    }
}
