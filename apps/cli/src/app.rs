//! Wires the session, remote ops, store and orchestrator together.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};

use rombridge_library_store::LibraryStore;
use rombridge_lifecycle::{DeleteSelection, LibraryOrchestrator, LifecycleEvent};
use rombridge_protocol::{Catalog, Game, Source};
use rombridge_remote_ops::RemoteOps;
use rombridge_remote_session::{RemoteSession, SshOptions};
use rombridge_settings::{ConfigStore, config_path, default_data_dir, library_path};

use crate::cli::{Cli, Command, PASSWORD_ENV};

/// Runs one subcommand to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(default_data_dir)
        .context("cannot determine a data directory; pass --data-dir")?;
    let source = load_source(&cli.catalog, &cli.source)?;
    let store = Arc::new(LibraryStore::open(library_path(&data_dir))?);

    if cli.command == Command::Status {
        print_status(&source, &store);
        return Ok(());
    }

    let config_store = ConfigStore::new(config_path(&data_dir));
    let descriptor = cli.descriptor(&config_store.get(), std::env::var(PASSWORD_ENV).ok())?;

    let session = Arc::new(RemoteSession::ssh(SshOptions {
        host_key_policy: cli.host_key_policy(),
        ..SshOptions::default()
    }));
    session.connect(&descriptor).await?;
    if let Err(e) = config_store.remember_connection(&descriptor) {
        warn!(error = %e, "failed to remember connection settings");
    }

    let mut orch = LibraryOrchestrator::new(Arc::new(RemoteOps::new(session.clone())), store);
    let printer = orch.take_events().map(|rx| tokio::spawn(print_events(rx)));

    let result = execute(&orch, &source, &cli.command).await;

    session.disconnect().await;
    drop(orch);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    result
}

async fn execute(
    orch: &LibraryOrchestrator,
    source: &Source,
    command: &Command,
) -> anyhow::Result<()> {
    match command {
        Command::Status => Ok(()),
        Command::Sync => {
            let report = orch.reconcile(source).await?;
            println!(
                "{} updated, {} unchanged, {} skipped",
                report.updated.len(),
                report.unchanged,
                report.skipped.len()
            );
            Ok(())
        }
        Command::Download { game } => {
            let game = find_game(source, game)?;
            let download = orch.download(source, game);
            tokio::pin!(download);

            let result = tokio::select! {
                result = &mut download => result,
                _ = tokio::signal::ctrl_c() => {
                    info!(game = %game.id, "interrupt received, cancelling download");
                    orch.cancel_download(game);
                    download.await
                }
            };
            match result {
                Err(e) if e.is_cancelled() => {
                    println!("{}: download cancelled", game.id);
                    Ok(())
                }
                other => Ok(other?),
            }
        }
        Command::Extract { game } => {
            let game = find_game(source, game)?;
            orch.extract(source, game).await?;
            Ok(())
        }
        Command::Delete {
            game,
            archive,
            folder,
        } => {
            let game = find_game(source, game)?;
            let status = orch
                .delete_data(source, game, DeleteSelection::new(*archive, *folder))
                .await?;
            println!("{}: {status}", game.id);
            Ok(())
        }
    }
}

fn load_source(path: &Path, name: &str) -> anyhow::Result<Source> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let catalog = Catalog::from_json(&text)
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    let source = catalog.source(name).with_context(|| {
        let known: Vec<_> = catalog.source_names().collect();
        format!("unknown source {name:?} (known: {})", known.join(", "))
    })?;
    Ok(source.clone())
}

fn find_game<'a>(source: &'a Source, id: &str) -> anyhow::Result<&'a Game> {
    source
        .game(id)
        .with_context(|| format!("no game {id:?} in this source"))
}

fn print_status(source: &Source, store: &LibraryStore) {
    for game in &source.games {
        println!("{:<24} {:<18} {}", game.id, store.status(&game.id), game.name);
    }
}

async fn print_events(mut rx: mpsc::Receiver<LifecycleEvent>) {
    let mut last_percent = None;
    while let Some(event) = rx.recv().await {
        match event {
            LifecycleEvent::Progress {
                game_id, percent, ..
            } => {
                if last_percent != Some(percent) {
                    eprintln!("{game_id}: {percent}%");
                    last_percent = Some(percent);
                }
            }
            LifecycleEvent::StatusChanged { game_id, status } => {
                println!("{game_id}: {status}");
                last_percent = None;
            }
            LifecycleEvent::Failed { game_id, error } => {
                eprintln!("{game_id}: {error}");
            }
        }
    }
}
