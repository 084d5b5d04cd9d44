use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::remote::HttpRemoteStore;

fn require_remote(config: &Config) -> Result<HttpRemoteStore> {
    HttpRemoteStore::from_config(config).context(
        "Remote sync is not configured. Run `fitlog sync configure --url <url>` first",
    )
}

fn read_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var("FITLOG_PASSWORD") {
        if !password.is_empty() {
            return Ok(password);
        }
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let line = io::stdin().lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

pub(crate) async fn cmd_signup(
    config: &Config,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let remote = require_remote(config)?;
    let password = read_password(password)?;
    let identity = remote.signup(email, &password).await?;
    config.save_session(&identity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
    } else {
        println!("Account created; signed in as {}", identity.email);
    }
    Ok(())
}

pub(crate) async fn cmd_login(
    config: &Config,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let remote = require_remote(config)?;
    let password = read_password(password)?;
    let identity = remote.login(email, &password).await?;
    config.save_session(&identity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
    } else {
        println!("Signed in as {}", identity.email);
    }
    Ok(())
}

pub(crate) fn cmd_logout(config: &Config, json: bool) -> Result<()> {
    let removed = config.clear_session()?;

    if json {
        println!("{}", serde_json::json!({ "logged_out": removed }));
    } else if removed {
        println!("Signed out.");
    } else {
        eprintln!("Not signed in.");
    }
    Ok(())
}

pub(crate) fn cmd_whoami(config: &Config, json: bool) -> Result<()> {
    match config.session() {
        Some(identity) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!("{} ({})", identity.email, identity.id);
            }
        }
        None => {
            if json {
                println!("null");
            } else {
                eprintln!("Not signed in.");
            }
        }
    }
    Ok(())
}
