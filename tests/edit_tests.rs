//! Edits applied through the Restrictions service

use routing_restrict::{
    CondOp, EditOp, Error, EvaluationContext, Instruction, ItemType, RestrictionConfig,
    Restrictions, RoutingPoint, TileIndex, Track, ValidationError,
};

fn signal(tile: u32) -> RoutingPoint {
    RoutingPoint::new(TileIndex(tile), Track::X)
}

fn insert(restrictions: &mut Restrictions, point: RoutingPoint, offset: usize, item: Instruction) {
    restrictions
        .apply(point, EditOp::Insert { offset, item })
        .unwrap();
}

fn length_if(value: u16) -> Instruction {
    Instruction::if_cond(ItemType::CondTrainLength, CondOp::MoreThan, value)
}

#[test]
fn test_insert_creates_program() {
    let mut restrictions = Restrictions::default();
    assert!(!restrictions.is_restricted(TileIndex(1)));

    insert(&mut restrictions, signal(1), 0, length_if(5));
    let program = restrictions.program(signal(1)).unwrap();
    assert_eq!(program.items(), &[length_if(5), Instruction::end_if()]);
    assert_eq!(program.refcount(), 1);
    assert!(restrictions.is_restricted(TileIndex(1)));
}

#[test]
fn test_modify_and_remove_need_program() {
    let mut restrictions = Restrictions::default();
    assert_eq!(
        restrictions.apply(signal(1), EditOp::Remove { offset: 0 }),
        Err(Error::NoProgram { point: signal(1) })
    );
    assert_eq!(
        restrictions.apply(
            signal(1),
            EditOp::Modify {
                offset: 0,
                item: Instruction::penalty(1)
            }
        ),
        Err(Error::NoProgram { point: signal(1) })
    );
    assert!(restrictions.store().is_empty());
}

#[test]
fn test_failed_insert_creates_nothing() {
    let mut restrictions = Restrictions::default();
    let err = restrictions
        .apply(
            signal(1),
            EditOp::Insert {
                offset: 0,
                item: Instruction::else_branch(),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Error::Validation(ValidationError::NoMatchingIf { offset: 0 })
    );
    assert!(restrictions.lookup(signal(1)).is_none());
    assert!(restrictions.store().is_empty());
}

#[test]
fn test_rejected_edit_leaves_program_untouched() {
    let mut restrictions = Restrictions::default();
    insert(&mut restrictions, signal(1), 0, length_if(5));
    insert(&mut restrictions, signal(1), 1, Instruction::penalty(4));
    let before = restrictions.program(signal(1)).unwrap().items().to_vec();

    assert_eq!(
        restrictions.apply(signal(1), EditOp::Remove { offset: 2 }),
        Err(Error::CannotRemoveEndIf { offset: 2 })
    );
    assert_eq!(
        restrictions.apply(
            signal(1),
            EditOp::Modify {
                offset: 1,
                item: length_if(2)
            }
        ),
        Err(Error::ConditionalityMismatch { offset: 1 })
    );
    assert_eq!(
        restrictions.apply(signal(1), EditOp::Remove { offset: 3 }),
        Err(Error::OffsetOutOfRange {
            offset: 3,
            length: 3
        })
    );
    assert_eq!(restrictions.program(signal(1)).unwrap().items(), &before[..]);
}

#[test]
fn test_removing_opening_if_removes_whole_chain() {
    let mut restrictions = Restrictions::default();
    let point = signal(1);
    insert(&mut restrictions, point, 0, length_if(5));
    insert(
        &mut restrictions,
        point,
        1,
        Instruction::elif_cond(ItemType::CondMaxSpeed, CondOp::LessThan, 60),
    );
    insert(&mut restrictions, point, 2, Instruction::else_branch());
    insert(&mut restrictions, point, 3, Instruction::penalty(1));
    assert_eq!(restrictions.program(point).unwrap().len(), 5);

    restrictions.apply(point, EditOp::Remove { offset: 0 }).unwrap();

    // emptied and unshared: the program is cleaned up
    assert!(restrictions.lookup(point).is_none());
    assert!(restrictions.store().is_empty());
    assert!(!restrictions.is_restricted(TileIndex(1)));
}

#[test]
fn test_empty_program_kept_without_cleanup() {
    let mut restrictions = Restrictions::new(RestrictionConfig {
        cleanup_empty_programs: false,
        ..RestrictionConfig::default()
    });
    insert(&mut restrictions, signal(1), 0, Instruction::penalty(1));
    restrictions
        .apply(signal(1), EditOp::Remove { offset: 0 })
        .unwrap();
    assert!(restrictions.program(signal(1)).unwrap().is_empty());
}

#[test]
fn test_empty_shared_program_stays_bound() {
    let mut restrictions = Restrictions::default();
    insert(&mut restrictions, signal(1), 0, Instruction::penalty(1));
    restrictions.share(signal(2), signal(1)).unwrap();
    restrictions
        .apply(signal(2), EditOp::Remove { offset: 0 })
        .unwrap();

    assert!(restrictions.program(signal(1)).unwrap().is_empty());
    assert_eq!(restrictions.lookup(signal(1)), restrictions.lookup(signal(2)));
}

#[test]
fn test_edit_through_one_referent_is_seen_by_all() {
    let mut restrictions = Restrictions::default();
    insert(&mut restrictions, signal(1), 0, Instruction::penalty(1));
    restrictions.share(signal(2), signal(1)).unwrap();
    insert(&mut restrictions, signal(2), 1, Instruction::deny(true));

    let ctx = EvaluationContext::default();
    let a = restrictions.evaluate(signal(1), &ctx).unwrap();
    let b = restrictions.evaluate(signal(2), &ctx).unwrap();
    assert!(a.deny);
    assert_eq!(a, b);
}

#[test]
fn test_full_store_reported_as_creation_failure() {
    let mut restrictions = Restrictions::new(RestrictionConfig {
        max_programs: 1,
        ..RestrictionConfig::default()
    });
    insert(&mut restrictions, signal(1), 0, Instruction::penalty(1));
    assert_eq!(
        restrictions.apply(
            signal(2),
            EditOp::Insert {
                offset: 0,
                item: Instruction::penalty(1)
            }
        ),
        Err(Error::StoreFull { capacity: 1 })
    );
    assert!(restrictions.lookup(signal(2)).is_none());
}
