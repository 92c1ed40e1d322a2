use std::path::Path;

use eyre::{Result, WrapErr};
use pinot_client::{ClientConfig, PinotClient};
use pinot_provisioner::{Action, Manifest, StatePersistence};

use crate::cli::{Cli, Command, ControllerArgs};

/// Environment first, then the manifest's `controller` block, then flags.
pub fn resolve_config(
    env: ClientConfig,
    manifest: Option<&Manifest>,
    args: &ControllerArgs,
) -> ClientConfig {
    let config = match manifest {
        Some(manifest) => env.overlay(manifest.controller.to_config()),
        None => env,
    };
    config.overlay(args.to_config())
}

async fn load_manifest(path: &Path, required: bool) -> Result<Option<Manifest>> {
    if !required && !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "no manifest, using environment and flags only");
        return Ok(None);
    }
    let manifest = Manifest::load(path).await?;
    Ok(Some(manifest))
}

async fn connect(
    manifest_path: &Path,
    args: &ControllerArgs,
    manifest_required: bool,
) -> Result<(Manifest, PinotClient)> {
    let manifest = load_manifest(manifest_path, manifest_required).await?;
    let config = resolve_config(ClientConfig::from_env(), manifest.as_ref(), args);
    let client = PinotClient::new(&config).wrap_err("configuring controller client")?;
    tracing::info!(controller = %client.base_url(), "using controller");
    Ok((manifest.unwrap_or_default(), client))
}

pub async fn run(cli: Cli) -> Result<()> {
    let persistence = StatePersistence::new(cli.state.clone());

    match cli.command {
        Command::Plan { json } => {
            let (manifest, client) = connect(&cli.manifest, &cli.controller, true).await?;
            let entries = pinot_provisioner::preview(&manifest, &client, &persistence).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.iter().all(|e| e.action == Action::Ok) {
                println!("No changes. Everything matches the manifest.");
            } else {
                for entry in entries.iter().filter(|e| e.is_change()) {
                    println!("{entry}");
                }
            }
        }
        Command::Apply => {
            let (manifest, client) = connect(&cli.manifest, &cli.controller, true).await?;
            let report = pinot_provisioner::provision(&manifest, &client, &persistence).await?;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            println!(
                "Apply complete: {} adopted, {} created, {} updated, {} deleted.",
                report.adopted.len(),
                report.created.len(),
                report.modified.len(),
                report.deleted.len()
            );
        }
        Command::Destroy => {
            let (_, client) = connect(&cli.manifest, &cli.controller, false).await?;
            let deleted = pinot_provisioner::destroy(&client, &persistence).await?;
            for addr in &deleted {
                println!("- {addr}");
            }
            println!("Destroy complete: {} deleted.", deleted.len());
        }
        Command::Import { kind, id } => {
            let (_, client) = connect(&cli.manifest, &cli.controller, false).await?;
            let mut state = persistence.load().await?;
            let rs = pinot_provisioner::import(&client, kind.into(), &id, &mut state, &persistence)
                .await
                .wrap_err_with(|| format!("importing {id}"))?;
            println!("Imported {}", rs.addr());
        }
        Command::State => show_state(&persistence).await?,
    }

    Ok(())
}

async fn show_state(persistence: &StatePersistence) -> Result<()> {
    let state = persistence.load().await?;
    if state.resources.is_empty() {
        println!("No tracked resources.");
        return Ok(());
    }
    for (addr, rs) in &state.resources {
        println!("{addr}\t{:?}", rs.status);
    }
    Ok(())
}
