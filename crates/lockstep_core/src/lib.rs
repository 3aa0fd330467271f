pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod ids;
pub mod io;
pub mod lifecycle;
pub mod rng;
pub mod scope;
pub mod seed;
pub mod stack;
pub mod suppress;
pub mod world;

use anyhow::{bail, Context, Result};
use context::DeterminismContext;
use io::script::{Script, Step};
use io::trace::{Recorder, TraceLine};
use rng::Generator;
use world::World;

pub use config::SessionConfig;
pub use error::{DeterminismError, ErrorKind};

/// Replay a script against a fresh context.
///
/// Every region's id block is reserved up front, the steps are driven through
/// the lifecycle boundaries they name, and the context is torn down at the
/// end so an unbalanced scope fails the replay. The returned trace is what
/// replicas compare to detect a desync.
pub fn replay(script: &Script) -> Result<Vec<TraceLine>> {
    let world = script.build_world()?;
    let mut ctx = DeterminismContext::new(script.session.clone());
    for region in world.regions() {
        ctx.reserve_block(region.id, region.id_block.clone());
    }

    let mut recorder = Recorder::default();
    run_steps(&mut ctx, &world, &script.steps, &mut recorder)
        .with_context(|| format!("replay of {:?} failed", script.name))?;
    ctx.finish().context("context left unbalanced")?;

    Ok(recorder.into_lines())
}

fn run_steps(
    ctx: &mut DeterminismContext,
    world: &World,
    steps: &[Step],
    recorder: &mut Recorder,
) -> Result<()> {
    for step in steps {
        run_step(ctx, world, step, recorder)?;
    }
    Ok(())
}

fn run_step(
    ctx: &mut DeterminismContext,
    world: &World,
    step: &Step,
    recorder: &mut Recorder,
) -> Result<()> {
    match step {
        Step::LoadGame { body } => ctx.load_game(|ctx| run_steps(ctx, world, body, recorder)),
        Step::ExposeRegion {
            region,
            phase,
            body,
        } => {
            ensure_region(world, *region)?;
            ctx.expose_region(*region, *phase, |ctx| {
                run_steps(ctx, world, body, recorder)
            })
        }
        Step::FinalizeRegion { region, body } => {
            ensure_region(world, *region)?;
            ctx.finalize_region(*region, |ctx| run_steps(ctx, world, body, recorder))
        }
        Step::Entity { entity, body } => {
            let entity = world.entity(*entity)?;
            ctx.with_entity_op(entity, |ctx| run_steps(ctx, world, body, recorder))
        }
        Step::Suppressed { body } => {
            ctx.with_suppressed(|ctx| run_steps(ctx, world, body, recorder))
        }
        Step::Try { body } => {
            if let Err(err) = run_steps(ctx, world, body, recorder) {
                if is_invariant_violation(&err) {
                    return Err(err);
                }
                recorder.record("failed").note = Some(format!("{:#}", err));
            }
            Ok(())
        }
        Step::Roll { count } => {
            for _ in 0..*count {
                let value = ctx.rand().next_u32();
                let suppressed = ctx.is_suppressed();
                let line = recorder.record("roll");
                line.value = Some(i64::from(value));
                line.suppressed = suppressed;
            }
            Ok(())
        }
        Step::EngineRoll { count } => {
            for _ in 0..*count {
                let value = ctx.engine().next_u32();
                recorder.record("engine_roll").value = Some(i64::from(value));
            }
            Ok(())
        }
        Step::MintId { count } => {
            for _ in 0..*count {
                let id = ctx.mint_id()?;
                let region = ctx.current_block();
                let line = recorder.record("mint_id");
                line.value = Some(i64::from(id));
                line.region = region;
            }
            Ok(())
        }
        Step::Context { region } => {
            let entity = ctx.current_entity();
            let faction = ctx.current_faction(*region);
            let line = recorder.record("context");
            line.region = Some(*region);
            line.entity = entity;
            line.faction = faction;
            Ok(())
        }
        Step::Fail { message } => bail!("{}", message),
    }
}

fn ensure_region(world: &World, region: world::RegionId) -> Result<()> {
    if !world.has_region(region) {
        bail!("unknown region {}", region);
    }
    Ok(())
}

fn is_invariant_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<DeterminismError>()
            .is_some_and(DeterminismError::is_invariant_violation)
    })
}
