use anyhow::{Result, bail};
use serde::Serialize;

use fitlog_core::insight::{InsightOutcome, InsightRequester, check_enough_data};

use super::connect;
use crate::config::Config;
use crate::gemini::GeminiClient;

#[derive(Serialize)]
struct CachedOutput<'a> {
    status: &'static str,
    message: &'a str,
}

pub(crate) async fn cmd_insight(config: &Config, regenerate: bool, json: bool) -> Result<()> {
    let svc = connect(config).await?;
    let Some(handle) = svc.principal().map(|p| p.handle.clone()) else {
        bail!("Not signed in");
    };

    let requester =
        InsightRequester::new(&config.insight_language).with_current(config.load_insight(&handle));
    if regenerate {
        requester.clear();
        config.clear_insight()?;
    }

    if let Some(text) = requester.current() {
        if json {
            let out = CachedOutput {
                status: "cached",
                message: &text,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{text}");
            eprintln!("\n(cached; run `fitlog insight --regenerate` for a fresh analysis)");
        }
        return Ok(());
    }

    if let Some(refused) = check_enough_data(svc.records()) {
        return print_outcome(&refused, json);
    }

    let gemini = GeminiClient::new(config.gemini_api_key()?, &config.gemini_model)?;
    eprintln!("Analysing your last week...");
    let outcome = requester.request(&gemini, svc.records()).await;

    if let InsightOutcome::Generated(ref text) = outcome {
        config.save_insight(&handle, text)?;
    }
    print_outcome(&outcome, json)
}

fn print_outcome(outcome: &InsightOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        match outcome {
            InsightOutcome::Generated(text) => println!("{text}"),
            InsightOutcome::Fallback(msg) | InsightOutcome::Refused(msg) => eprintln!("{msg}"),
        }
    }
    Ok(())
}
