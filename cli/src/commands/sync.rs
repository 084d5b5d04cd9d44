use std::sync::Arc;

use anyhow::{Context, Result};

use fitlog_core::store::Store;
use fitlog_core::sync::Reconciler;

use crate::config::Config;
use crate::remote::{HttpRemoteStore, warn_local_only};

pub(crate) fn cmd_sync_configure(config: &Config, url: &str, json: bool) -> Result<()> {
    config.set_remote_url(url)?;

    if json {
        println!("{}", serde_json::json!({ "remote_url": url.trim() }));
    } else {
        println!("Sync backend set to {}", url.trim());
        println!("Next: `fitlog account signup <email>` or `fitlog account login <email>`.");
    }
    Ok(())
}

pub(crate) fn cmd_sync_status(config: &Config, store: &Store, json: bool) -> Result<()> {
    let remote_url = config.remote_url();
    let session = config.session();
    let state = store.snapshot();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "remote_url": remote_url,
                "account": session,
                "counts": {
                    "weights": state.weights.len(),
                    "foods": state.foods.len(),
                    "diary": state.diary.len(),
                    "workouts": state.workouts.len(),
                    "pantry": state.pantry.len(),
                    "cookbook": state.cookbook.len(),
                },
            }))?
        );
        return Ok(());
    }

    match &remote_url {
        Some(url) => println!("Backend:  {url}"),
        None => println!("Backend:  not configured (local-only mode)"),
    }
    match &session {
        Some(identity) => println!("Account:  {}", identity.email),
        None => println!("Account:  not signed in"),
    }
    println!(
        "Local:    {} weights, {} foods, {} diary entries, {} workouts ({} pantry, {} recipes stay local)",
        state.weights.len(),
        state.foods.len(),
        state.diary.len(),
        state.workouts.len(),
        state.pantry.len(),
        state.cookbook.len(),
    );
    Ok(())
}

fn build_reconciler(config: &Config, store: &Store) -> Result<Option<Reconciler>> {
    let Some(remote) = HttpRemoteStore::from_config(config) else {
        warn_local_only();
        return Ok(None);
    };
    let identity = config
        .session()
        .context("Not signed in. Run `fitlog account login <email>` first")?;
    Ok(Some(Reconciler::new(
        store.clone(),
        Arc::new(remote),
        identity.id,
    )))
}

/// One-shot reconcile: hydrate from remote, then push the local snapshot.
pub(crate) async fn cmd_sync_now(config: &Config, store: &Store) -> Result<()> {
    let Some(sync) = build_reconciler(config, store)? else {
        return Ok(());
    };

    sync.hydrate().await;
    sync.push_now().await;
    println!("Synced.");
    Ok(())
}

/// Live session: debounced pushes plus remote live updates until Ctrl-C.
pub(crate) async fn cmd_sync_watch(config: &Config, store: &Store) -> Result<()> {
    let Some(sync) = build_reconciler(config, store)? else {
        return Ok(());
    };

    sync.hydrate().await;
    sync.start();
    eprintln!("Watching for changes (Ctrl-C to stop)...");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    sync.shutdown();
    println!("Stopped.");
    Ok(())
}
