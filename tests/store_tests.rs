//! Integration tests for the todo store.
//!
//! These tests run every mutation against an in-memory SQLite database, so the
//! unique `(parent, order)` index and the parent foreign key are enforced on
//! each intermediate write.

use todo_forest::db::Database;
use todo_forest::error::TodoError;
use todo_forest::types::{DropTarget, MovePayload, NewTodo, TodoId, TodoUpdate};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn add(db: &Database, title: &str) -> TodoId {
    db.create_todo(NewTodo::new(title, 1))
        .expect("Failed to create todo")
        .id
}

/// Ids under `parent` in order, with their stored orders checked to be 0..n-1.
fn children(db: &Database, parent: Option<TodoId>) -> Vec<TodoId> {
    let todos = db.get_children(parent).expect("Failed to list children");
    for (pos, todo) in todos.iter().enumerate() {
        assert_eq!(todo.order as usize, pos, "todo {} under {:?}", todo.id, parent);
        assert_eq!(todo.depended_by_id, parent);
    }
    todos.into_iter().map(|t| t.id).collect()
}

fn assert_settled(db: &Database) {
    let violations = db.order_violations().expect("Failed to check orders");
    assert!(violations.is_empty(), "violations: {:?}", violations);
}

mod create_tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn create_appends_to_root_list() {
        let db = setup_db();

        let a = db.create_todo(NewTodo::new("Paint walls", 3)).unwrap();
        let b = db.create_todo(NewTodo::new("Lay floor", 2)).unwrap();
        let c = db.create_todo(NewTodo::new("Fit kitchen", 5)).unwrap();

        assert_eq!((a.order, b.order, c.order), (0, 1, 2));
        assert!(a.depended_by_id.is_none());
        assert_eq!(b.duration, 2);
        assert!(a.created_at > 0);
        assert_eq!(children(&db, None), vec![a.id, b.id, c.id]);
    }

    #[test]
    fn create_stores_optional_fields() {
        let db = setup_db();
        let due = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let created = db
            .create_todo(
                NewTodo::new("Order tiles", 0)
                    .with_due_date(due)
                    .with_img_url("https://img.example/tiles.png"),
            )
            .unwrap();

        let fetched = db.get_todo(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.due_date, Some(due));
        assert_eq!(fetched.img_url.as_deref(), Some("https://img.example/tiles.png"));
        assert_eq!(fetched.duration, 0);
    }

    #[test]
    fn create_rejects_blank_title() {
        let db = setup_db();

        let err = db.create_todo(NewTodo::new("   ", 1)).unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { field: "title", .. }));
        assert!(db.list_todos().unwrap().is_empty());
    }

    #[test]
    fn create_rejects_negative_duration() {
        let db = setup_db();

        let err = db.create_todo(NewTodo::new("Plaster", -1)).unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { field: "duration", .. }));
        assert!(db.list_todos().unwrap().is_empty());
    }

    #[test]
    fn list_returns_newest_first() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");

        let ids: Vec<TodoId> = db.list_todos().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn get_missing_todo_is_none() {
        let db = setup_db();
        assert!(db.get_todo(42).unwrap().is_none());
        assert_eq!(db.get_children(Some(42)).unwrap_err(), TodoError::NotFound(42));
    }
}

mod move_tests {
    use super::*;

    #[test]
    fn move_root_under_another_root() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");

        let moved = db.move_todo(c, MovePayload::new(Some(a), 0)).unwrap();

        assert_eq!(moved.depended_by_id, Some(a));
        assert_eq!(moved.order, 0);
        assert_eq!(children(&db, None), vec![a, b]);
        assert_eq!(children(&db, Some(a)), vec![c]);
    }

    #[test]
    fn move_down_within_same_list() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        let d = add(&db, "d");

        db.move_todo(a, MovePayload::new(None, 2)).unwrap();

        assert_eq!(children(&db, None), vec![b, c, a, d]);
    }

    #[test]
    fn move_up_within_same_list() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        let d = add(&db, "d");

        db.move_todo(d, MovePayload::new(None, 0)).unwrap();

        assert_eq!(children(&db, None), vec![d, a, b, c]);
    }

    #[test]
    fn move_into_middle_of_other_list() {
        let db = setup_db();
        let parent = add(&db, "parent");
        let x = add(&db, "x");
        let y = add(&db, "y");
        let z = add(&db, "z");
        let moving = add(&db, "moving");
        for (index, id) in [x, y, z].into_iter().enumerate() {
            db.move_todo(id, MovePayload::new(Some(parent), index as i64)).unwrap();
        }

        db.move_todo(moving, MovePayload::new(Some(parent), 1)).unwrap();

        assert_eq!(children(&db, Some(parent)), vec![x, moving, y, z]);
        assert_eq!(children(&db, None), vec![parent]);
        assert_settled(&db);
    }

    #[test]
    fn move_between_child_lists_renumbers_both() {
        let db = setup_db();
        let p = add(&db, "p");
        let q = add(&db, "q");
        let p1 = add(&db, "p1");
        let p2 = add(&db, "p2");
        let p3 = add(&db, "p3");
        let q1 = add(&db, "q1");
        db.move_todo(p1, MovePayload::new(Some(p), 0)).unwrap();
        db.move_todo(p2, MovePayload::new(Some(p), 1)).unwrap();
        db.move_todo(p3, MovePayload::new(Some(p), 2)).unwrap();
        db.move_todo(q1, MovePayload::new(Some(q), 0)).unwrap();

        db.move_todo(p1, MovePayload::new(Some(q), 1)).unwrap();

        assert_eq!(children(&db, Some(p)), vec![p2, p3]);
        assert_eq!(children(&db, Some(q)), vec![q1, p1]);
        assert_settled(&db);
    }

    #[test]
    fn move_index_past_end_appends() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");

        let moved = db.move_todo(a, MovePayload::new(None, 99)).unwrap();

        assert_eq!(moved.order, 2);
        assert_eq!(children(&db, None), vec![b, c, a]);
    }

    #[test]
    fn move_to_current_place_changes_nothing() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");

        let moved = db.move_todo(b, MovePayload::new(None, 1)).unwrap();

        assert_eq!(moved.order, 1);
        assert_eq!(children(&db, None), vec![a, b, c]);
    }

    #[test]
    fn move_under_own_descendant_is_rejected() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();
        db.move_todo(c, MovePayload::new(Some(b), 0)).unwrap();

        let err = db.move_todo(a, MovePayload::new(Some(c), 0)).unwrap_err();
        assert_eq!(err, TodoError::Cycle { id: a, parent: c });

        let err = db.move_todo(a, MovePayload::new(Some(a), 0)).unwrap_err();
        assert_eq!(err, TodoError::Cycle { id: a, parent: a });

        assert_eq!(children(&db, None), vec![a]);
        assert_eq!(children(&db, Some(a)), vec![b]);
        assert_eq!(children(&db, Some(b)), vec![c]);
    }

    #[test]
    fn move_with_negative_index_is_rejected() {
        let db = setup_db();
        let a = add(&db, "a");
        add(&db, "b");

        let err = db.move_todo(a, MovePayload::new(None, -1)).unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { field: "targetIndex", .. }));
        assert_eq!(db.get_todo(a).unwrap().unwrap().order, 0);
    }

    #[test]
    fn move_missing_todo_or_parent_is_not_found() {
        let db = setup_db();
        let a = add(&db, "a");

        assert_eq!(
            db.move_todo(77, MovePayload::new(None, 0)).unwrap_err(),
            TodoError::NotFound(77)
        );
        assert_eq!(
            db.move_todo(a, MovePayload::new(Some(88), 0)).unwrap_err(),
            TodoError::NotFound(88)
        );
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn delete_leaf_closes_gap() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");

        db.delete_todo(b).unwrap();

        assert!(db.get_todo(b).unwrap().is_none());
        assert_eq!(children(&db, None), vec![a, c]);
    }

    #[test]
    fn delete_promotes_children_into_place() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let e = add(&db, "e");
        let c = add(&db, "c");
        let d = add(&db, "d");
        db.move_todo(c, MovePayload::new(Some(b), 0)).unwrap();
        db.move_todo(d, MovePayload::new(Some(b), 1)).unwrap();

        db.delete_todo(b).unwrap();

        assert_eq!(children(&db, None), vec![a, c, d, e]);
        assert_settled(&db);
    }

    #[test]
    fn delete_middle_of_chain_reattaches_grandchild() {
        // A -> B -> C; deleting B leaves A -> C
        let db = setup_db();
        let a = add(&db, "A");
        let b = add(&db, "B");
        let c = add(&db, "C");
        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();
        db.move_todo(c, MovePayload::new(Some(b), 0)).unwrap();

        db.delete_todo(b).unwrap();

        let c = db.get_todo(c).unwrap().unwrap();
        assert_eq!(c.depended_by_id, Some(a));
        assert_eq!(c.order, 0);
        assert_eq!(children(&db, None), vec![a]);
    }

    #[test]
    fn delete_missing_todo_is_not_found() {
        let db = setup_db();
        add(&db, "a");
        assert_eq!(db.delete_todo(9).unwrap_err(), TodoError::NotFound(9));
    }
}

mod update_tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn update_changes_only_given_fields() {
        let db = setup_db();
        let due = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let id = db
            .create_todo(NewTodo::new("Draft", 2).with_due_date(due).with_img_url("a.png"))
            .unwrap()
            .id;

        let updated = db
            .update_todo(
                id,
                TodoUpdate {
                    title: Some("Final".to_string()),
                    img_url: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.duration, 2);
        assert_eq!(updated.due_date, Some(due));
        assert!(updated.img_url.is_none());
    }

    #[test]
    fn update_with_placement_moves_todo() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");

        let updated = db
            .update_todo(
                b,
                TodoUpdate {
                    duration: Some(4),
                    placement: Some(MovePayload::new(Some(a), 0)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.duration, 4);
        assert_eq!(updated.depended_by_id, Some(a));
        assert_eq!(children(&db, None), vec![a]);
    }

    #[test]
    fn failed_placement_rolls_back_field_changes() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();

        let err = db
            .update_todo(
                a,
                TodoUpdate {
                    title: Some("renamed".to_string()),
                    placement: Some(MovePayload::new(Some(b), 0)),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err, TodoError::Cycle { id: a, parent: b });
        assert_eq!(db.get_todo(a).unwrap().unwrap().title, "a");
    }

    #[test]
    fn update_validates_before_writing() {
        let db = setup_db();
        let a = add(&db, "a");

        let err = db
            .update_todo(
                a,
                TodoUpdate {
                    duration: Some(-3),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TodoError::InvalidInput { field: "duration", .. }));

        assert_eq!(
            db.update_todo(99, TodoUpdate::default()).unwrap_err(),
            TodoError::NotFound(99)
        );
        assert_eq!(db.get_todo(a).unwrap().unwrap().duration, 1);
    }
}

mod drop_tests {
    use super::*;

    #[test]
    fn drop_onto_todo_makes_first_child() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();

        let moved = db.drop_todo(c, DropTarget::Onto(a)).unwrap().unwrap();

        assert_eq!(moved.order, 0);
        assert_eq!(children(&db, Some(a)), vec![c, b]);
    }

    #[test]
    fn drop_after_later_sibling_accounts_for_removal() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        let d = add(&db, "d");

        db.drop_todo(a, DropTarget::After(c)).unwrap().unwrap();

        assert_eq!(children(&db, None), vec![b, c, a, d]);
    }

    #[test]
    fn drop_after_todo_in_other_list() {
        let db = setup_db();
        let a = add(&db, "a");
        let x = add(&db, "x");
        let y = add(&db, "y");
        let moving = add(&db, "moving");
        db.move_todo(x, MovePayload::new(Some(a), 0)).unwrap();
        db.move_todo(y, MovePayload::new(Some(a), 1)).unwrap();

        db.drop_todo(moving, DropTarget::After(x)).unwrap().unwrap();

        assert_eq!(children(&db, Some(a)), vec![x, moving, y]);
        assert_eq!(children(&db, None), vec![a]);
    }

    #[test]
    fn drop_at_beginning_of_root_list() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();

        db.drop_todo(b, DropTarget::BeginningOf(None)).unwrap().unwrap();

        assert_eq!(children(&db, None), vec![b, a]);
        assert!(children(&db, Some(a)).is_empty());
    }

    #[test]
    fn drops_that_change_nothing_return_none() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");

        assert!(db.drop_todo(a, DropTarget::Onto(a)).unwrap().is_none());
        assert!(db.drop_todo(b, DropTarget::After(a)).unwrap().is_none());
        assert!(db.drop_todo(a, DropTarget::BeginningOf(None)).unwrap().is_none());
        assert_eq!(children(&db, None), vec![a, b]);
    }

    #[test]
    fn drop_into_own_subtree_is_rejected() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();

        let err = db.drop_todo(a, DropTarget::BeginningOf(Some(b))).unwrap_err();
        assert_eq!(err, TodoError::Cycle { id: a, parent: b });
        assert_eq!(children(&db, Some(a)), vec![b]);
    }
}

mod order_tests {
    use super::*;

    fn set_order(db: &Database, id: TodoId, order: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE todos SET sibling_order = ?1 WHERE id = ?2",
                [order, id],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn repair_renumbers_drifted_lists() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        set_order(&db, c, 7);
        set_order(&db, b, 4);

        let violations = db.order_violations().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].parent, None);
        assert_eq!(violations[0].orders, vec![0, 4, 7]);

        assert_eq!(db.repair_orders().unwrap(), 1);
        assert_eq!(children(&db, None), vec![a, b, c]);
        assert_eq!(db.repair_orders().unwrap(), 0);
    }

    #[test]
    fn move_out_of_drifted_list_renumbers_it() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        let d = add(&db, "d");
        set_order(&db, d, 9);
        set_order(&db, c, 5);

        db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();

        assert_eq!(children(&db, None), vec![a, c, d]);
        assert_eq!(children(&db, Some(a)), vec![b]);
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// One mutation; indices pick among the todos alive at that point.
    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Delete(usize),
        Move {
            pick: usize,
            parent: Option<usize>,
            index: i64,
        },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            any::<usize>().prop_map(Op::Delete),
            (any::<usize>(), proptest::option::of(any::<usize>()), 0i64..6)
                .prop_map(|(pick, parent, index)| Op::Move { pick, parent, index }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn orders_stay_contiguous_after_any_sequence(
            seed in 1usize..6,
            ops in proptest::collection::vec(op_strategy(), 1..40),
        ) {
            let db = setup_db();
            let mut ids: Vec<TodoId> = (0..seed).map(|i| add(&db, &format!("t{}", i))).collect();

            for op in ops {
                match op {
                    Op::Add => ids.push(add(&db, "added")),
                    Op::Delete(_) if ids.is_empty() => {}
                    Op::Delete(pick) => {
                        let victim = ids.remove(pick % ids.len());
                        prop_assert!(db.delete_todo(victim).is_ok());
                    }
                    Op::Move { .. } if ids.is_empty() => {}
                    Op::Move { pick, parent, index } => {
                        let id = ids[pick % ids.len()];
                        let parent = parent.map(|p| ids[p % ids.len()]);
                        match db.move_todo(id, MovePayload::new(parent, index)) {
                            Ok(_) | Err(TodoError::Cycle { .. }) => {}
                            Err(e) => prop_assert!(false, "move {} under {:?} failed: {}", id, parent, e),
                        }
                    }
                }

                let violations = db.order_violations().unwrap();
                prop_assert!(violations.is_empty(), "violations: {:?}", violations);
            }

            prop_assert_eq!(db.load_forest().unwrap().len(), ids.len());
        }
    }
}

mod rollback_tests {
    use super::*;

    /// Every todo as `(id, parent, order)`, sorted by id.
    fn placements(db: &Database) -> Vec<(TodoId, Option<TodoId>, u32)> {
        let mut rows: Vec<_> = db
            .list_todos()
            .unwrap()
            .into_iter()
            .map(|t| (t.id, t.depended_by_id, t.order))
            .collect();
        rows.sort_unstable();
        rows
    }

    /// Make the store refuse to give `id` a final order.
    fn fail_final_write_of(db: &Database, id: TodoId) {
        db.with_conn(|conn| {
            conn.execute_batch(&format!(
                "CREATE TRIGGER refuse_final_order BEFORE UPDATE OF sibling_order ON todos
                 WHEN NEW.id = {} AND NEW.sibling_order >= 0
                 BEGIN SELECT RAISE(ABORT, 'refused'); END;",
                id
            ))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn delete_failing_mid_plan_restores_every_order() {
        let db = setup_db();
        let a = add(&db, "a");
        let b = add(&db, "b");
        let c = add(&db, "c");
        let d = add(&db, "d");
        let child = add(&db, "child");
        db.move_todo(child, MovePayload::new(Some(b), 0)).unwrap();
        let before = placements(&db);
        fail_final_write_of(&db, d);

        let err = db.delete_todo(b).unwrap_err();

        assert!(matches!(err, TodoError::TransactionFailure(_)), "got {:?}", err);
        assert_eq!(placements(&db), before);
        assert!(db.get_todo(b).unwrap().is_some());
        assert_eq!(children(&db, None), vec![a, b, c, d]);
        assert_eq!(children(&db, Some(b)), vec![child]);
    }

    #[test]
    fn move_failing_mid_plan_restores_both_lists() {
        let db = setup_db();
        let parent = add(&db, "parent");
        let x = add(&db, "x");
        let y = add(&db, "y");
        let z = add(&db, "z");
        let moving = add(&db, "moving");
        let tail = add(&db, "tail");
        for (index, id) in [x, y, z].into_iter().enumerate() {
            db.move_todo(id, MovePayload::new(Some(parent), index as i64)).unwrap();
        }
        let before = placements(&db);
        fail_final_write_of(&db, moving);

        let err = db.move_todo(moving, MovePayload::new(Some(parent), 1)).unwrap_err();

        assert!(matches!(err, TodoError::TransactionFailure(_)), "got {:?}", err);
        assert_eq!(placements(&db), before);
        assert_eq!(children(&db, None), vec![parent, moving, tail]);
        assert_eq!(children(&db, Some(parent)), vec![x, y, z]);
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn file_database_keeps_forest_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");

        let (a, b) = {
            let db = Database::open(&path).unwrap();
            let a = add(&db, "a");
            let b = add(&db, "b");
            db.move_todo(b, MovePayload::new(Some(a), 0)).unwrap();
            (a, b)
        };

        let db = Database::open(&path).unwrap();
        assert_eq!(children(&db, None), vec![a]);
        assert_eq!(children(&db, Some(a)), vec![b]);
        let c = add(&db, "c");
        assert_eq!(db.get_todo(c).unwrap().unwrap().order, 1);
    }
}
