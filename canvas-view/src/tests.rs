// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use canvas_core::{AccessType, BlockId, BlockPatch, NewBlock, UserId};
use canvas_store::{BlockStore, MemoryStore, WritableBlockStore, assert_all_stores};

use crate::test_utils::{FaultyStore, FaultyStoreError, chain, create, link, setup_logging};
use crate::{Canvas, CanvasError, DEFAULT_COLOR, Detached, ViewConfig, ViewStatus, traverse};

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

#[tokio::test]
async fn public_leaf_root() {
    setup_logging();

    assert_all_stores!(|store| async {
        let root = create(&store, ALICE, AccessType::Public).await;
        let canvas = Canvas::new(store.clone());

        let response = canvas.resolve_view(&BOB, &root).await.unwrap();
        assert_eq!(response.status, ViewStatus::Authoritative);
        assert!(!response.is_degraded());
        assert_eq!(response.blocks.len(), 1);

        let view = &response.blocks[&root];
        assert_eq!(view.paths, vec![root.to_string()]);
        assert!(view.is_fully_loaded);
        assert!(!view.is_ambiguous);
        assert!(view.children.is_empty());
        assert_eq!(view.effective_status, AccessType::Public);
        assert_eq!(view.color, DEFAULT_COLOR);
    });
}

#[tokio::test]
async fn private_root_resolves_inherited_descendants() {
    assert_all_stores!(|store| async {
        let ids = chain(&store, ALICE, AccessType::Private, 3).await;
        let canvas = Canvas::new(store.clone());

        let response = canvas.resolve_view(&ALICE, &ids[0]).await.unwrap();
        assert_eq!(response.blocks.len(), 3);

        for id in &ids[1..] {
            let view = &response.blocks[id];
            assert_eq!(view.direct_status, AccessType::Inherited);
            assert_eq!(view.effective_status, AccessType::Private);
            assert!(!view.is_ambiguous);
        }
        assert!(response.blocks.values().all(|view| view.is_fully_loaded));

        // Other users can't use a private block as root.
        let response = canvas.resolve_view(&BOB, &ids[0]).await.unwrap();
        assert_eq!(response.status, ViewStatus::NotVisible);
        assert!(response.is_empty());
    });
}

#[tokio::test]
async fn depth_ceiling() {
    assert_all_stores!(|store| async {
        let canvas = Canvas::new(store.clone());

        // Six blocks: the deepest one sits exactly on the ceiling.
        let ids = chain(&store, ALICE, AccessType::Public, 6).await;
        let response = canvas.resolve_view(&ALICE, &ids[0]).await.unwrap();
        assert_eq!(response.blocks.len(), 6);
        assert!(!response.blocks[&ids[5]].is_fully_loaded);
        assert!(response.blocks[&ids[4]].is_fully_loaded);

        let records = canvas.resolve_records(&ALICE, &ids[0]).await.unwrap();
        assert!(!records[&ids[5]].summary.is_fully_loaded());

        // Seven blocks: the last one is cut off, its parent reports deeper children.
        let ids = chain(&store, ALICE, AccessType::Public, 7).await;
        let traversal = traverse(&store, &ids[0], &ALICE, canvas.config())
            .await
            .unwrap();
        assert_eq!(traversal.records.len(), 6);
        assert!(traversal.records.iter().all(|record| record.id != ids[6]));

        let ceiling = traversal
            .records
            .iter()
            .find(|record| record.id == ids[5])
            .unwrap();
        assert_eq!(ceiling.depth, 5);
        assert!(!ceiling.is_complete);
        assert!(ceiling.has_deeper_children);

        // The cut off child is still listed as a first level child.
        let response = canvas.resolve_view(&ALICE, &ids[0]).await.unwrap();
        assert_eq!(response.blocks[&ids[5]].children, vec![ids[6]]);
        assert!(!response.blocks.contains_key(&ids[6]));
    });
}

#[tokio::test]
async fn depth_bound_holds_for_dense_graphs() {
    assert_all_stores!(|store| async {
        let ids = chain(&store, ALICE, AccessType::Public, 9).await;

        // Shortcuts and back edges on top of the chain.
        link(&store, ids[0], ids[3]).await;
        link(&store, ids[2], ids[7]).await;
        link(&store, ids[8], ids[1]).await;
        link(&store, ids[6], ids[0]).await;

        for max_depth in [1, 3, 5] {
            let config = ViewConfig::default().max_depth(max_depth);
            let traversal = traverse(&store, &ids[0], &ALICE, &config).await.unwrap();

            for record in &traversal.records {
                assert!(record.depth <= max_depth);
                assert_eq!(record.path.len(), record.depth + 1);

                let mut distinct = record.path.clone();
                distinct.sort();
                distinct.dedup();
                assert_eq!(distinct.len(), record.path.len(), "repeated id in path");
            }
        }
    });
}

#[tokio::test]
async fn unresolved_root_makes_children_ambiguous() {
    assert_all_stores!(|store| async {
        let root = create(&store, ALICE, AccessType::Inherited).await;
        let own = create(&store, ALICE, AccessType::Inherited).await;
        let foreign = create(&store, BOB, AccessType::Inherited).await;
        let shared = create(&store, BOB, AccessType::Inherited).await;
        let public = create(&store, BOB, AccessType::Public).await;
        let direct = create(&store, BOB, AccessType::Inherited).await;
        link(&store, root, own).await;
        link(&store, root, foreign).await;
        link(&store, root, direct).await;
        link(&store, foreign, shared).await;
        link(&store, foreign, public).await;
        store.grant_visible(&shared, &ALICE).await.unwrap();
        store.grant_visible(&direct, &ALICE).await.unwrap();

        let canvas = Canvas::new(store.clone());
        let response = canvas.resolve_view(&ALICE, &root).await.unwrap();
        let blocks = &response.blocks;

        assert!(!blocks[&root].is_ambiguous);
        assert_eq!(blocks[&root].effective_status, AccessType::Inherited);

        // Nothing proves that Alice may see Bob's block ..
        assert!(blocks[&foreign].is_ambiguous);

        // .. which carries over to everything only reachable through it.
        assert!(blocks[&shared].is_ambiguous);
        assert!(blocks[&public].is_ambiguous);
        assert_eq!(blocks[&public].effective_status, AccessType::Public);

        // Direct grants lift the ambiguity on their own path.
        assert!(!blocks[&own].is_ambiguous);
        assert!(!blocks[&direct].is_ambiguous);
    });
}

#[tokio::test]
async fn absolute_access_is_path_independent() {
    assert_all_stores!(|store| async {
        let root = create(&store, ALICE, AccessType::Inherited).await;
        let private = create(&store, ALICE, AccessType::Private).await;
        let inherited = create(&store, ALICE, AccessType::Inherited).await;
        let public = create(&store, ALICE, AccessType::Public).await;
        let editable = create(&store, ALICE, AccessType::PublicEditable).await;
        link(&store, root, private).await;
        link(&store, root, inherited).await;
        link(&store, private, public).await;
        link(&store, inherited, public).await;
        link(&store, private, editable).await;
        link(&store, public, editable).await;

        let traversal = traverse(&store, &root, &ALICE, &ViewConfig::default())
            .await
            .unwrap();

        for (id, expected) in [
            (public, AccessType::Public),
            (editable, AccessType::PublicEditable),
            (private, AccessType::Private),
        ] {
            let records: Vec<_> = traversal
                .records
                .iter()
                .filter(|record| record.id == id)
                .collect();
            assert!(!records.is_empty());
            assert!(records.iter().all(|record| record.effective_access == expected));
        }

        // `public` is reached along two paths, `editable` along three.
        let count = |id: BlockId| traversal.records.iter().filter(|r| r.id == id).count();
        assert_eq!(count(public), 2);
        assert_eq!(count(editable), 3);
    });
}

#[tokio::test]
async fn block_with_two_parents() {
    assert_all_stores!(|store| async {
        let root = create(&store, ALICE, AccessType::Public).await;
        let p1 = create(&store, ALICE, AccessType::Public).await;
        let detour = create(&store, ALICE, AccessType::Inherited).await;
        let p2 = create(&store, BOB, AccessType::Private).await;
        let n = create(&store, BOB, AccessType::Inherited).await;
        link(&store, root, p1).await;
        link(&store, root, detour).await;
        link(&store, detour, p2).await;
        link(&store, p1, n).await;
        link(&store, p2, n).await;

        let canvas = Canvas::new(store.clone());
        let response = canvas.resolve_view(&ALICE, &root).await.unwrap();

        let view = &response.blocks[&n];
        assert_eq!(
            view.paths,
            vec![
                format!("{root},{p1},{n}"),
                format!("{root},{detour},{p2},{n}"),
            ]
        );
        assert!(view.is_fully_loaded);

        // The shortest path decides, along it the block is public.
        assert_eq!(view.effective_status, AccessType::Public);

        // The private parent is part of the view, marked as what it is.
        assert_eq!(response.blocks[&p2].effective_status, AccessType::Private);

        // With the ceiling right at the longer path only that one counts as incomplete, which
        // makes the whole block not fully loaded.
        let canvas = Canvas::from_config(store.clone(), ViewConfig::default().max_depth(3));
        let response = canvas.resolve_view(&ALICE, &root).await.unwrap();
        assert_eq!(response.blocks[&n].paths.len(), 2);
        assert!(!response.blocks[&n].is_fully_loaded);
    });
}

#[tokio::test]
async fn colors_are_inherited_along_paths() {
    assert_all_stores!(|store| async {
        let root = store
            .insert_block(&ALICE, NewBlock::new().access_type(AccessType::Public).color("red"))
            .await
            .unwrap()
            .id;
        let plain = create(&store, ALICE, AccessType::Inherited).await;
        let blue = store
            .insert_block(&ALICE, NewBlock::new().color("blue"))
            .await
            .unwrap()
            .id;
        let below_blue = create(&store, ALICE, AccessType::Inherited).await;
        let shared = create(&store, ALICE, AccessType::Inherited).await;
        link(&store, root, plain).await;
        link(&store, root, blue).await;
        link(&store, blue, below_blue).await;
        link(&store, plain, shared).await;
        link(&store, blue, shared).await;

        let canvas = Canvas::new(store.clone());
        let response = canvas.resolve_view(&ALICE, &root).await.unwrap();
        let blocks = &response.blocks;

        assert_eq!(blocks[&plain].color, "red");
        assert_eq!(blocks[&blue].color, "blue");
        assert_eq!(blocks[&below_blue].color, "blue");

        // Both paths have the same length, the one with the smaller ids wins.
        assert_eq!(blocks[&shared].paths.len(), 2);
        assert_eq!(blocks[&shared].color, "red");

        // Without any color along the path the configured default is used.
        let root = create(&store, ALICE, AccessType::Public).await;
        let config = ViewConfig::default().default_color("grey");
        let canvas = Canvas::from_config(store.clone(), config);
        let response = canvas.resolve_view(&ALICE, &root).await.unwrap();
        assert_eq!(response.blocks[&root].color, "grey");
    });
}

#[tokio::test]
async fn cyclic_graphs_terminate() {
    assert_all_stores!(|store| async {
        let a = create(&store, ALICE, AccessType::Public).await;
        let b = create(&store, ALICE, AccessType::Inherited).await;
        let c = create(&store, ALICE, AccessType::Inherited).await;
        link(&store, a, b).await;
        link(&store, b, a).await;
        link(&store, b, c).await;
        link(&store, c, b).await;
        link(&store, c, c).await;

        let canvas = Canvas::new(store.clone());
        let response = canvas.resolve_view(&ALICE, &a).await.unwrap();

        assert_eq!(response.blocks.len(), 3);
        assert_eq!(response.blocks[&c].paths, vec![format!("{a},{b},{c}")]);
        assert_eq!(response.blocks[&c].children, vec![b, c]);
        assert!(response.blocks.values().all(|view| view.is_fully_loaded));
    });
}

#[tokio::test]
async fn repeated_views_are_identical() {
    assert_all_stores!(|store| async {
        let root = create(&store, ALICE, AccessType::Inherited).await;
        let ids = chain(&store, BOB, AccessType::Inherited, 4).await;
        link(&store, root, ids[0]).await;
        link(&store, root, ids[2]).await;

        let canvas = Canvas::new(store.clone());
        let first = canvas.resolve_view(&ALICE, &root).await.unwrap();
        let second = canvas.resolve_view(&ALICE, &root).await.unwrap();
        assert_eq!(first, second);

        let (left, right) = tokio::join!(
            canvas.resolve_view(&ALICE, &root),
            canvas.resolve_view(&ALICE, &root)
        );
        assert_eq!(left.unwrap(), first);
        assert_eq!(right.unwrap(), first);
    });
}

#[tokio::test]
async fn missing_and_invisible_roots_look_the_same() {
    assert_all_stores!(|store| async {
        let private = create(&store, ALICE, AccessType::Private).await;
        let canvas = Canvas::new(store.clone());

        let invisible = canvas.resolve_view(&BOB, &private).await.unwrap();
        let missing = canvas.resolve_view(&BOB, &BlockId::new(999)).await.unwrap();

        assert_eq!(invisible, missing);
        assert_eq!(missing.status, ViewStatus::NotVisible);
        assert!(missing.is_degraded());
    });
}

#[tokio::test]
async fn public_editable_root_needs_direct_grant() {
    assert_all_stores!(|store| async {
        let root = create(&store, ALICE, AccessType::PublicEditable).await;
        let child = create(&store, ALICE, AccessType::Inherited).await;
        link(&store, root, child).await;
        let canvas = Canvas::new(store.clone());

        let response = canvas.resolve_view(&BOB, &root).await.unwrap();
        assert_eq!(response.status, ViewStatus::NotVisible);
        assert!(response.is_empty());

        let response = canvas.resolve_view(&ALICE, &root).await.unwrap();
        assert_eq!(response.status, ViewStatus::Authoritative);
        assert_eq!(response.blocks.len(), 2);

        // Once shared, Bob sees it like any other root.
        store.grant_visible(&root, &BOB).await.unwrap();
        let response = canvas.resolve_view(&BOB, &root).await.unwrap();
        assert_eq!(response.blocks.len(), 2);
        assert_eq!(
            response.blocks[&child].effective_status,
            AccessType::PublicEditable
        );
    });
}

#[tokio::test]
async fn home_views() {
    assert_all_stores!(|store| async {
        let canvas = Canvas::new(store.clone());

        // No home block yet.
        let response = canvas.resolve_home_view(Some(&ALICE)).await.unwrap();
        assert_eq!(response.status, ViewStatus::NotVisible);

        let home = canvas.register_user(&ALICE, "alice").await.unwrap();
        assert_eq!(home.access_type, AccessType::Private);
        assert_eq!(home.text.as_deref(), Some("alice"));

        let response = canvas.resolve_home_view(Some(&ALICE)).await.unwrap();
        assert_eq!(response.status, ViewStatus::Authoritative);
        assert!(response.blocks.contains_key(&home.id));

        // Anonymous visitors see the public fallback root through the eyes of its owner.
        let welcome = create(&store, BOB, AccessType::Public).await;
        let note = create(&store, BOB, AccessType::Private).await;
        link(&store, welcome, note).await;

        let canvas = Canvas::from_config(
            store.clone(),
            ViewConfig::default().fallback_root(welcome, BOB),
        );
        let response = canvas.resolve_home_view(None).await.unwrap();
        assert_eq!(response.status, ViewStatus::AnonymousFallback);
        assert!(response.is_degraded());
        assert_eq!(response.blocks.len(), 2);
        assert!(!response.blocks.contains_key(&home.id));
    });
}

#[tokio::test]
async fn failing_store_is_an_error() {
    setup_logging();

    let store = MemoryStore::new();
    let root = create(&store, ALICE, AccessType::Public).await;
    let canvas = Canvas::new(FaultyStore::new(store).offline());

    let result = canvas.resolve_view(&ALICE, &root).await;
    assert!(matches!(
        result,
        Err(CanvasError::StoreUnavailable(FaultyStoreError::Offline))
    ));

    let result = canvas.resolve_home_view(Some(&ALICE)).await;
    assert!(matches!(result, Err(CanvasError::StoreUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out() {
    let store = MemoryStore::new();
    let root = create(&store, ALICE, AccessType::Public).await;

    let canvas = Canvas::from_config(
        FaultyStore::new(store).delay(Duration::from_secs(10)),
        ViewConfig::default().store_timeout(Duration::from_secs(1)),
    );

    let result = canvas.resolve_view(&ALICE, &root).await;
    assert!(matches!(
        result,
        Err(CanvasError::StoreTimeout(duration)) if duration == Duration::from_secs(1)
    ));

    // Without a timeout the slow store answers eventually.
    let canvas = Canvas::new(canvas.store().clone());
    let response = canvas.resolve_view(&ALICE, &root).await.unwrap();
    assert_eq!(response.blocks.len(), 1);
}

#[tokio::test]
async fn vanished_blocks_stop_expansion() {
    let store = MemoryStore::new();
    let ids = chain(&store, ALICE, AccessType::Public, 3).await;

    let canvas = Canvas::new(FaultyStore::new(store).vanish(ids[1]));
    let response = canvas.resolve_view(&ALICE, &ids[0]).await.unwrap();

    assert_eq!(response.status, ViewStatus::Authoritative);
    assert!(response.blocks.contains_key(&ids[1]));
    assert!(!response.blocks.contains_key(&ids[2]));
    assert_eq!(response.blocks[&ids[1]].children, vec![ids[2]]);
}

#[tokio::test]
async fn create_and_update_blocks() {
    assert_all_stores!(|store| async {
        let canvas = Canvas::new(store.clone());
        let home = canvas.register_user(&ALICE, "alice").await.unwrap();

        // New blocks always inherit, whatever was requested.
        let block = canvas
            .create_block(
                &ALICE,
                NewBlock::new().access_type(AccessType::Public),
                Some(&home.id),
            )
            .await
            .unwrap();
        assert_eq!(block.access_type, AccessType::Inherited);
        assert_eq!(store.parent_count(&block.id).await.unwrap(), 1);

        let result = canvas
            .create_block(&BOB, NewBlock::new(), Some(&home.id))
            .await;
        assert!(matches!(
            result,
            Err(CanvasError::PermissionDenied { user, block }) if user == BOB && block == home.id
        ));

        let result = canvas
            .create_block(&ALICE, NewBlock::new(), Some(&BlockId::new(999)))
            .await;
        assert!(matches!(result, Err(CanvasError::BlockNotFound(_))));

        let patch = BlockPatch {
            text: Some("changed".into()),
            ..Default::default()
        };
        let result = canvas.update_block(&BOB, &block.id, patch.clone()).await;
        assert!(matches!(result, Err(CanvasError::PermissionDenied { .. })));

        let updated = canvas
            .update_block(&ALICE, &block.id, patch.clone())
            .await
            .unwrap();
        assert_eq!(updated.text.as_deref(), Some("changed"));

        let result = canvas
            .update_block(&ALICE, &BlockId::new(999), patch.clone())
            .await;
        assert!(matches!(result, Err(CanvasError::BlockNotFound(_))));

        // Anyone may edit public editable blocks ..
        let open = canvas
            .update_block(
                &ALICE,
                &block.id,
                BlockPatch {
                    access_type: Some(AccessType::PublicEditable),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        canvas.update_block(&BOB, &open.id, patch).await.unwrap();

        // .. but not restructure them.
        let result = canvas.detach_child(&BOB, &home.id, &open.id).await;
        assert!(matches!(result, Err(CanvasError::PermissionDenied { .. })));
    });
}

#[tokio::test]
async fn detach_deletes_orphans() {
    assert_all_stores!(|store| async {
        let canvas = Canvas::new(store.clone());
        let home = canvas.register_user(&ALICE, "alice").await.unwrap();
        let other = canvas
            .create_block(&ALICE, NewBlock::new(), Some(&home.id))
            .await
            .unwrap();
        let child = canvas
            .create_block(&ALICE, NewBlock::new(), Some(&home.id))
            .await
            .unwrap();
        assert!(canvas.attach_child(&ALICE, &other.id, &child.id).await.unwrap());
        assert!(!canvas.attach_child(&ALICE, &other.id, &child.id).await.unwrap());

        let result = canvas.detach_child(&BOB, &home.id, &child.id).await;
        assert!(matches!(result, Err(CanvasError::PermissionDenied { .. })));

        assert_eq!(
            canvas.detach_child(&ALICE, &home.id, &child.id).await.unwrap(),
            Detached::Removed
        );
        assert!(store.get_block(&child.id).await.unwrap().is_some());

        let result = canvas.detach_child(&ALICE, &home.id, &child.id).await;
        assert!(matches!(result, Err(CanvasError::NotAChild { .. })));

        assert_eq!(
            canvas.detach_child(&ALICE, &other.id, &child.id).await.unwrap(),
            Detached::Deleted
        );
        assert!(store.get_block(&child.id).await.unwrap().is_none());

        let response = canvas.resolve_view(&ALICE, &home.id).await.unwrap();
        assert_eq!(response.blocks[&other.id].children, Vec::<BlockId>::new());
    });
}

#[tokio::test]
async fn sharing_blocks() {
    assert_all_stores!(|store| async {
        let canvas = Canvas::new(store.clone());
        let home = canvas.register_user(&ALICE, "alice").await.unwrap();
        let note = canvas
            .create_block(&ALICE, NewBlock::new(), Some(&home.id))
            .await
            .unwrap();

        let result = canvas.share(&BOB, &home.id, &BOB, true).await;
        assert!(matches!(result, Err(CanvasError::PermissionDenied { .. })));

        // Visibility alone makes the home block a root for Bob, but no editor.
        canvas.share(&ALICE, &home.id, &BOB, false).await.unwrap();
        let response = canvas.resolve_view(&BOB, &home.id).await.unwrap();
        assert_eq!(response.blocks.len(), 2);
        assert_eq!(response.blocks[&note.id].effective_status, AccessType::Private);

        let result = canvas.create_block(&BOB, NewBlock::new(), Some(&home.id)).await;
        assert!(matches!(result, Err(CanvasError::PermissionDenied { .. })));

        canvas.share(&ALICE, &home.id, &BOB, true).await.unwrap();
        canvas
            .create_block(&BOB, NewBlock::new(), Some(&home.id))
            .await
            .unwrap();
    });
}
