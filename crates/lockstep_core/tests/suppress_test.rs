use lockstep_core::context::DeterminismContext;
use lockstep_core::rng::Generator;
use lockstep_core::{DeterminismError, SessionConfig};

#[test]
fn nested_suppression_restores_state_and_logs_once() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    ctx.rand().next_u32();
    let before = ctx.rand().snapshot();

    ctx.begin_suppressed_scope().unwrap();
    ctx.rand().next_u32();
    ctx.begin_suppressed_scope().unwrap();
    assert_eq!(ctx.suppression_depth(), 2);
    ctx.rand().next_u32();
    ctx.end_suppressed_scope().unwrap();
    assert!(ctx.is_suppressed());
    ctx.end_suppressed_scope().unwrap();

    assert!(!ctx.is_suppressed());
    assert_eq!(ctx.rand().snapshot(), before);
    assert_eq!(ctx.nested_suppressions(), 1);
    ctx.finish().unwrap();
}

#[test]
fn suppressed_draws_do_not_advance_shared_stream() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    let mut reference = DeterminismContext::new(SessionConfig::multiplayer(7));

    ctx.with_suppressed(|ctx| {
        for _ in 0..5 {
            ctx.rand().next_u32();
        }
        Ok::<_, DeterminismError>(())
    })
    .unwrap();

    assert_eq!(ctx.rand().next_u32(), reference.rand().next_u32());
    assert_eq!(ctx.nested_suppressions(), 0);
}
