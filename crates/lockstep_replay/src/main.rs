use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use lockstep_core::io::script::Script;
use lockstep_core::io::trace::{to_ndjson, TraceLine};
use lockstep_core::replay;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "lockstep-replay",
    about = "Replay a lockstep scenario on independent replicas and compare their traces"
)]
struct Args {
    /// Path to the scenario JSON document.
    #[arg(long = "script", value_name = "PATH")]
    script: PathBuf,

    /// Override the session id from the scenario.
    #[arg(long, value_name = "NUMBER", conflicts_with = "session_label")]
    session_id: Option<i32>,

    /// Override the session with a label hashed into an id.
    #[arg(long, value_name = "TEXT", conflicts_with = "session_id")]
    session_label: Option<String>,

    /// Run as a single-player session (no seeding, no id blocks).
    #[arg(long)]
    single_player: bool,

    /// Number of independent replicas to run.
    #[arg(long, default_value_t = 2)]
    replicas: u32,

    /// Output NDJSON trace path.
    #[arg(long)]
    out: PathBuf,
}

fn apply_overrides(script: &mut Script, args: &Args) {
    if let Some(id) = args.session_id {
        script.session.session_id = Some(id);
        script.session.session_label = None;
    }
    if let Some(label) = &args.session_label {
        script.session.session_label = Some(label.clone());
        script.session.session_id = None;
    }
    if args.single_player {
        script.session.multiplayer = false;
    }
}

/// Replay `script` on `replicas` fresh contexts and return the agreed trace.
fn run_replicas(script: &Script, replicas: u32) -> Result<Vec<TraceLine>> {
    ensure!(replicas > 0, "at least one replica is required");

    let reference = replay(script).context("replica 0 failed")?;
    for replica in 1..replicas {
        let trace = replay(script).with_context(|| format!("replica {} failed", replica))?;
        if let Some(seq) = first_divergence(&reference, &trace) {
            error!(replica, seq, "replica diverged");
            bail!("desync: replica {} diverged from replica 0 at line {}", replica, seq);
        }
    }
    Ok(reference)
}

fn first_divergence(reference: &[TraceLine], trace: &[TraceLine]) -> Option<usize> {
    let common = reference.len().min(trace.len());
    (0..common)
        .find(|&index| reference[index] != trace[index])
        .or_else(|| (reference.len() != trace.len()).then_some(common))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut script = Script::load_from_path(&args.script)
        .with_context(|| format!("failed to read script {:?}", args.script))?;
    apply_overrides(&mut script, &args);

    let trace = run_replicas(&script, args.replicas)?;
    info!(
        script = %script.name,
        replicas = args.replicas,
        lines = trace.len(),
        "replicas agree"
    );

    let file =
        File::create(&args.out).with_context(|| format!("failed to create {:?}", args.out))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(to_ndjson(&trace)?.as_bytes())?;
    writer.flush()?;

    Ok(())
}
