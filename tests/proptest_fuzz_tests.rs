//! Property-based fuzzing tests for program editing, validation and execution
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. Decoding and validating arbitrary instruction words never panics
//! 2. Every program reachable through edits passes validation
//! 3. Validated programs execute without panicking and deterministically

use proptest::prelude::*;
use routing_restrict::{
    apply_edit, execute, validate, CondOp, EditOp, EntryDirection, Error, EvaluationContext,
    Instruction, ItemType, ProgramResult,
};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

fn cond_kind() -> impl Strategy<Value = ItemType> {
    prop_oneof![
        Just(ItemType::CondTrainLength),
        Just(ItemType::CondMaxSpeed),
        Just(ItemType::CondEntryDirection),
        Just(ItemType::CondTrainWeight),
        Just(ItemType::CondUndefined),
    ]
}

fn cond_op() -> impl Strategy<Value = CondOp> {
    prop_oneof![
        Just(CondOp::Is),
        Just(CondOp::IsNot),
        Just(CondOp::LessThan),
        Just(CondOp::LessThanEquals),
        Just(CondOp::MoreThan),
        Just(CondOp::MoreThanEquals),
    ]
}

/// Any instruction a user could try to place, valid position or not
fn placeable_item() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        (cond_kind(), cond_op(), 0u16..64).prop_map(|(k, o, v)| Instruction::if_cond(k, o, v)),
        (cond_kind(), cond_op(), 0u16..64).prop_map(|(k, o, v)| Instruction::elif_cond(k, o, v)),
        (cond_kind(), cond_op(), 0u16..64).prop_map(|(k, o, v)| Instruction::orif_cond(k, o, v)),
        Just(Instruction::else_branch()),
        Just(Instruction::end_if()),
        any::<bool>().prop_map(Instruction::deny),
        any::<u16>().prop_map(Instruction::penalty),
    ]
}

/// Raw words as they arrive over transport: any flag bits on any conditional
/// type, plus fully arbitrary words
fn raw_item() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        (8u32..14, 0u32..8, 0u32..8, any::<u16>()).prop_map(|(kind, flags, op, value)| {
            Instruction::from_raw(kind | flags << 5 | op << 10 | u32::from(value) << 16)
        }),
        any::<u32>().prop_map(Instruction::from_raw),
    ]
}

/// Edit with offsets that may fall outside the program
fn edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (0usize..24, placeable_item()).prop_map(|(offset, item)| EditOp::Insert { offset, item }),
        (0usize..24, placeable_item()).prop_map(|(offset, item)| EditOp::Modify { offset, item }),
        (0usize..24, raw_item()).prop_map(|(offset, item)| EditOp::Insert { offset, item }),
        (0usize..24, raw_item()).prop_map(|(offset, item)| EditOp::Modify { offset, item }),
        (0usize..24).prop_map(|offset| EditOp::Remove { offset }),
    ]
}

fn entry_direction() -> impl Strategy<Value = EntryDirection> {
    prop_oneof![
        Just(EntryDirection::NorthEast),
        Just(EntryDirection::SouthEast),
        Just(EntryDirection::SouthWest),
        Just(EntryDirection::NorthWest),
    ]
}

fn agent() -> impl Strategy<Value = EvaluationContext> {
    (any::<u32>(), any::<u16>(), any::<u16>(), entry_direction()).prop_map(
        |(total_length, max_speed, weight, entry_direction)| EvaluationContext {
            total_length,
            max_speed,
            weight,
            entry_direction,
        },
    )
}

/// Folds a list of edits over an empty program, keeping the accepted ones
fn build_program(ops: &[EditOp]) -> Vec<Instruction> {
    let mut items = Vec::new();
    for &op in ops {
        if let Ok(edited) = apply_edit(&items, op) {
            items = edited.items;
        }
    }
    items
}

// =============================================================================
// INSTRUCTION DECODING
// =============================================================================

proptest! {
    /// Field accessors and Display never panic on arbitrary words
    #[test]
    fn decode_never_panics(raw in any::<u32>()) {
        let item = Instruction::from_raw(raw);
        let _ = item.kind();
        let _ = item.cond_flags();
        let _ = item.cond_op();
        let _ = item.value();
        let _ = item.to_string();
    }

    /// Validation returns a verdict for arbitrary word sequences
    #[test]
    fn validate_never_panics(raws in prop::collection::vec(any::<u32>(), 0..40)) {
        let items: Vec<_> = raws.into_iter().map(Instruction::from_raw).collect();
        let _ = validate(&items);
    }

    /// Whatever validation accepts, execution can run
    #[test]
    fn validated_raw_programs_execute(
        raws in prop::collection::vec(any::<u32>(), 0..40),
        state in agent()
    ) {
        let items: Vec<_> = raws.into_iter().map(Instruction::from_raw).collect();
        if items.iter().all(|item| item.is_placeable()) && validate(&items).is_ok() {
            let _ = execute(&items, &state);
        }
    }
}

// =============================================================================
// EDITING
// =============================================================================

proptest! {
    /// Accepted edits always leave a structurally valid program
    #[test]
    fn edits_preserve_validity(ops in prop::collection::vec(edit_op(), 0..60)) {
        let mut items = Vec::new();
        for op in ops {
            match apply_edit(&items, op) {
                Ok(edited) => {
                    prop_assert_eq!(validate(&edited.items), Ok(edited.actions_used));
                    items = edited.items;
                }
                Err(_) => prop_assert!(validate(&items).is_ok()),
            }
        }
    }

    /// Inserting an opening if anywhere in a valid program is accepted
    #[test]
    fn inserting_if_always_succeeds(
        ops in prop::collection::vec(edit_op(), 0..40),
        position in any::<prop::sample::Index>(),
        kind in cond_kind(),
        op in cond_op()
    ) {
        let items = build_program(&ops);
        let offset = position.index(items.len() + 1);
        let edited = apply_edit(&items, EditOp::Insert {
            offset,
            item: Instruction::if_cond(kind, op, 1),
        });
        prop_assert!(edited.is_ok());
        prop_assert_eq!(edited.map(|e| e.items.len()).unwrap_or(0), items.len() + 2);
    }

    /// Removal on an edited program never reports an internal inconsistency
    #[test]
    fn removal_never_fails_internally(
        ops in prop::collection::vec(edit_op(), 0..60),
        position in any::<prop::sample::Index>()
    ) {
        let items = build_program(&ops);
        if !items.is_empty() {
            let offset = position.index(items.len());
            let removed = apply_edit(&items, EditOp::Remove { offset });
            prop_assert!(!matches!(removed, Err(Error::Internal(_))), "{:?}", removed);
            if items[offset].is_end_if() {
                prop_assert_eq!(removed, Err(Error::CannotRemoveEndIf { offset }));
            }
        }
    }

    /// Inserting an action anywhere in a valid program is accepted
    #[test]
    fn inserting_action_always_succeeds(
        ops in prop::collection::vec(edit_op(), 0..40),
        position in any::<prop::sample::Index>(),
        penalty in any::<u16>()
    ) {
        let items = build_program(&ops);
        let offset = position.index(items.len() + 1);
        let edited = apply_edit(&items, EditOp::Insert {
            offset,
            item: Instruction::penalty(penalty),
        });
        prop_assert!(edited.is_ok());
    }
}

// =============================================================================
// EXECUTION
// =============================================================================

proptest! {
    /// Execution of edited programs is deterministic and leaves its input alone
    #[test]
    fn execution_is_deterministic(
        ops in prop::collection::vec(edit_op(), 0..60),
        state in agent()
    ) {
        let items = build_program(&ops);
        let before = items.clone();
        let first = execute(&items, &state);
        let second = execute(&items, &state);
        prop_assert_eq!(first, second);
        prop_assert_eq!(items, before);
    }

    /// Programs without actions always yield the default result
    #[test]
    fn action_free_programs_allow(
        ops in prop::collection::vec(edit_op(), 0..60),
        state in agent()
    ) {
        let items = build_program(&ops);
        let actions = validate(&items);
        prop_assert!(actions.is_ok());
        if actions.map(|a| a.is_empty()).unwrap_or(false) {
            prop_assert_eq!(execute(&items, &state), ProgramResult::default());
        }
    }
}
