use lockstep_core::context::DeterminismContext;
use lockstep_core::entity::{Entity, EntityKind};
use lockstep_core::{DeterminismError, SessionConfig};

fn entity(id: i32, kind: EntityKind, faction: Option<i32>) -> Entity {
    Entity {
        id,
        kind,
        faction,
        region: Some(1),
    }
}

#[test]
fn reentrant_operations_see_innermost_context() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    let a = entity(1, EntityKind::Pawn, Some(10));
    let b = entity(2, EntityKind::Building, Some(20));

    ctx.with_entity_op(&a, |ctx| {
        assert_eq!(ctx.current_entity(), Some(1));
        assert_eq!(ctx.current_faction(1), Some(10));
        ctx.with_entity_op(&b, |ctx| {
            assert_eq!(ctx.current_entity(), Some(2));
            assert_eq!(ctx.current_faction(1), Some(20));
            Ok::<_, DeterminismError>(())
        })?;
        assert_eq!(ctx.current_entity(), Some(1));
        assert_eq!(ctx.current_faction(1), Some(10));
        Ok::<_, DeterminismError>(())
    })
    .unwrap();

    assert_eq!(ctx.current_entity(), None);
    assert_eq!(ctx.current_faction(1), None);
    ctx.finish().unwrap();
}

#[test]
fn factionless_kinds_leave_faction_unchanged() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    let pawn = entity(1, EntityKind::Pawn, Some(10));
    let plant = entity(2, EntityKind::Plant, Some(99));

    ctx.with_entity_op(&pawn, |ctx| {
        ctx.with_entity_op(&plant, |ctx| {
            assert_eq!(ctx.current_entity(), Some(2));
            assert_eq!(ctx.faction_depth(1), 1);
            assert_eq!(ctx.current_faction(1), Some(10));
            Ok::<_, DeterminismError>(())
        })
    })
    .unwrap();
    ctx.finish().unwrap();
}

#[test]
fn entity_without_faction_pushes_no_faction() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    let stray = entity(3, EntityKind::Pawn, None);
    ctx.with_entity_op(&stray, |ctx| {
        assert_eq!(ctx.current_entity(), Some(3));
        assert_eq!(ctx.faction_depth(1), 0);
        Ok::<_, DeterminismError>(())
    })
    .unwrap();
    ctx.finish().unwrap();
}

#[test]
fn unspawned_entity_tracks_entity_only() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    let carried = Entity {
        id: 4,
        kind: EntityKind::Pawn,
        faction: Some(10),
        region: None,
    };
    ctx.with_entity_op(&carried, |ctx| {
        assert_eq!(ctx.current_entity(), Some(4));
        assert_eq!(ctx.faction_depth(1), 0);
        Ok::<_, DeterminismError>(())
    })
    .unwrap();
    ctx.finish().unwrap();
}

#[test]
fn failing_operation_still_pops_context() {
    let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
    let a = entity(1, EntityKind::Pawn, Some(10));
    let err = ctx
        .with_entity_op(&a, |_| Err::<(), _>(DeterminismError::SuppressionUnderflow))
        .unwrap_err();
    assert_eq!(err, DeterminismError::SuppressionUnderflow);
    assert_eq!(ctx.current_entity(), None);
    assert_eq!(ctx.faction_depth(1), 0);
    ctx.finish().unwrap();
}
