use anyhow::Result;
use std::process;

use fitlog_core::models::Principal;
use fitlog_core::service::FitlogService;

use super::backend_client;
use super::helpers::{json_error, prompt_line};
use crate::config::Config;

fn read_secret(secret: Option<String>) -> Result<String> {
    match secret {
        Some(s) => Ok(s),
        None => prompt_line("Password"),
    }
}

fn print_signed_in(principal: &Principal, records: usize, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "handle": principal.handle,
                "user_id": principal.user_id,
                "records": records,
            })
        );
    } else {
        println!("Signed in as {} ({records} records)", principal.handle);
    }
    Ok(())
}

pub(crate) async fn cmd_signup(
    config: &Config,
    handle: &str,
    secret: Option<String>,
    json: bool,
) -> Result<()> {
    let secret = read_secret(secret)?;
    let mut svc = FitlogService::new(backend_client(config)?);
    let principal = svc.sign_up(handle, &secret).await?;
    config.clear_session()?;
    config.save_session(&principal)?;
    print_signed_in(&principal, svc.records().len(), json)
}

pub(crate) async fn cmd_login(
    config: &Config,
    handle: &str,
    secret: Option<String>,
    json: bool,
) -> Result<()> {
    let secret = read_secret(secret)?;
    let mut svc = FitlogService::new(backend_client(config)?);
    let principal = svc.sign_in(handle, &secret).await?;
    config.clear_session()?;
    config.save_session(&principal)?;
    print_signed_in(&principal, svc.records().len(), json)
}

pub(crate) async fn cmd_logout(config: &Config, json: bool) -> Result<()> {
    let Some(principal) = config.load_session()? else {
        if json {
            println!("{}", json_error("Not signed in"));
        } else {
            eprintln!("Not signed in");
        }
        process::exit(2);
    };

    // Local state goes even when the backend is unreachable or misconfigured.
    if let Ok(client) = backend_client(config) {
        FitlogService::resume(client, principal.clone()).sign_out().await;
    }
    config.clear_session()?;

    if json {
        println!("{}", serde_json::json!({ "signed_out": principal.handle }));
    } else {
        println!("Signed out {}", principal.handle);
    }
    Ok(())
}

pub(crate) fn cmd_whoami(config: &Config, json: bool) -> Result<()> {
    match config.load_session()? {
        Some(p) if json => {
            println!(
                "{}",
                serde_json::json!({ "handle": p.handle, "user_id": p.user_id })
            );
        }
        Some(p) => println!("{} ({})", p.handle, p.user_id),
        None => {
            if json {
                println!("{}", json_error("Not signed in"));
            } else {
                eprintln!("Not signed in");
            }
            process::exit(2);
        }
    }
    Ok(())
}
