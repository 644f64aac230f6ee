use std::collections::HashSet;

use kinship::db::{NewAccount, Store};
use kinship::domain::{AccountId, Relative};
use kinship::entities::hierarchy_edges;
use kinship::hierarchy::{HierarchyEngine, HierarchyError};
use sea_orm::{EntityTrait, Set};

async fn setup() -> (Store, HierarchyEngine) {
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store");
    let engine = HierarchyEngine::new(store.edge_store());
    (store, engine)
}

async fn account(store: &Store, code: &str) -> AccountId {
    store
        .create_account(NewAccount {
            email: format!("{}@example.com", code.to_lowercase()),
            phone: "5550100".to_string(),
            referral_code: code.to_string(),
            password_hash: "unused".to_string(),
            first_name: code.to_string(),
            last_name: String::new(),
            parent_id: None,
        })
        .await
        .expect("Failed to create account")
        .id
}

fn pairs(relatives: &[Relative]) -> Vec<(AccountId, u32)> {
    relatives.iter().map(|r| (r.account, r.depth)).collect()
}

#[tokio::test]
async fn root_gets_only_self_edge() {
    let (store, engine) = setup().await;
    let r = account(&store, "ROOT").await;

    let written = engine.attach(r, None).await.unwrap();
    assert_eq!(written.len(), 1);
    assert!(written[0].is_self_edge());

    assert_eq!(pairs(&engine.ancestors_of(r).await.unwrap()), vec![(r, 0)]);
    assert_eq!(
        pairs(&engine.descendants_of(r, None).await.unwrap()),
        vec![(r, 0)]
    );
    assert!(engine.is_attached(r).await.unwrap());
}

#[tokio::test]
async fn three_level_chain() {
    let (store, engine) = setup().await;
    let r = account(&store, "R").await;
    let c1 = account(&store, "C1").await;
    let c2 = account(&store, "C2").await;

    engine.attach(r, None).await.unwrap();
    engine.attach(c1, Some(r)).await.unwrap();
    let written = engine.attach(c2, Some(c1)).await.unwrap();

    let written: Vec<_> = written
        .iter()
        .map(|e| (e.ancestor, e.descendant, e.depth))
        .collect();
    assert_eq!(written, vec![(c2, c2, 0), (c1, c2, 1), (r, c2, 2)]);

    assert_eq!(
        pairs(&engine.ancestors_of(c2).await.unwrap()),
        vec![(c2, 0), (c1, 1), (r, 2)]
    );
    assert_eq!(
        pairs(&engine.descendants_of(r, None).await.unwrap()),
        vec![(r, 0), (c1, 1), (c2, 2)]
    );
    assert_eq!(
        pairs(&engine.descendants_of(r, Some(1)).await.unwrap()),
        vec![(r, 0), (c1, 1)]
    );
    assert_eq!(
        pairs(&engine.descendants_of(r, Some(0)).await.unwrap()),
        vec![(r, 0)]
    );
}

#[tokio::test]
async fn second_attach_is_duplicate_and_changes_nothing() {
    let (store, engine) = setup().await;
    let r = account(&store, "R").await;
    let c = account(&store, "C").await;

    engine.attach(r, None).await.unwrap();
    engine.attach(c, Some(r)).await.unwrap();
    let before = engine.descendants_of(r, None).await.unwrap();

    let err = engine.attach(c, Some(r)).await.unwrap_err();
    assert!(matches!(err, HierarchyError::DuplicateEdge { descendant } if descendant == c));

    let err = engine.attach(r, None).await.unwrap_err();
    assert!(matches!(err, HierarchyError::DuplicateEdge { .. }));

    assert_eq!(engine.descendants_of(r, None).await.unwrap(), before);
    assert_eq!(
        pairs(&engine.ancestors_of(c).await.unwrap()),
        vec![(c, 0), (r, 1)]
    );
}

#[tokio::test]
async fn dangling_parent_leaves_no_edges() {
    let (store, engine) = setup().await;
    let p = account(&store, "P").await;
    let x = account(&store, "X").await;

    let err = engine.attach(x, Some(p)).await.unwrap_err();
    assert!(matches!(err, HierarchyError::DanglingParent { parent } if parent == p));

    assert!(!engine.is_attached(x).await.unwrap());
    assert!(engine.ancestors_of(x).await.unwrap().is_empty());

    // The failed attempt did not poison a later, valid attach.
    engine.attach(x, None).await.unwrap();
    assert!(engine.is_attached(x).await.unwrap());
}

#[tokio::test]
async fn self_parent_is_rejected() {
    let (store, engine) = setup().await;
    let x = account(&store, "X").await;

    let err = engine.attach(x, Some(x)).await.unwrap_err();
    assert!(matches!(err, HierarchyError::DanglingParent { .. }));
    assert!(!engine.is_attached(x).await.unwrap());
}

#[tokio::test]
async fn failed_batch_rolls_back_self_edge() {
    let (store, engine) = setup().await;
    let r = account(&store, "R").await;
    let x = account(&store, "X").await;
    engine.attach(r, None).await.unwrap();

    // A stray pair that collides with the derived (R, X, 1) edge.
    hierarchy_edges::Entity::insert(hierarchy_edges::ActiveModel {
        ancestor_id: Set(r.value()),
        descendant_id: Set(x.value()),
        depth: Set(5),
    })
    .exec_without_returning(&store.conn)
    .await
    .unwrap();

    let err = engine.attach(x, Some(r)).await.unwrap_err();
    assert!(matches!(err, HierarchyError::DuplicateEdge { .. }));

    assert!(!engine.is_attached(x).await.unwrap());
    assert_eq!(
        pairs(&engine.ancestors_of(x).await.unwrap()),
        vec![(r, 5)]
    );
}

#[tokio::test]
async fn wide_tree_keeps_closure_invariants() {
    let (store, engine) = setup().await;
    let r = account(&store, "R").await;
    let a = account(&store, "A").await;
    let b = account(&store, "B").await;
    let c = account(&store, "C").await;
    let d = account(&store, "D").await;
    let e = account(&store, "E").await;

    engine.attach(r, None).await.unwrap();
    engine.attach(a, Some(r)).await.unwrap();
    engine.attach(d, Some(r)).await.unwrap();
    engine.attach(b, Some(a)).await.unwrap();
    engine.attach(c, Some(b)).await.unwrap();
    engine.attach(e, Some(d)).await.unwrap();

    let parents = [(a, r), (d, r), (b, a), (c, b), (e, d)];

    for (child, parent) in parents {
        let chain = engine.ancestors_of(child).await.unwrap();
        let parent_chain = engine.ancestors_of(parent).await.unwrap();

        // Self edge first, then the parent at depth 1.
        assert_eq!(chain[0], Relative::new(child, 0));
        assert_eq!(chain[1], Relative::new(parent, 1));

        // Every ancestor of the parent is an ancestor of the child, one deeper.
        for ancestor in &parent_chain {
            assert!(chain.contains(&Relative::new(ancestor.account, ancestor.depth + 1)));
        }
        assert_eq!(chain.len(), parent_chain.len() + 1);

        let unique: HashSet<_> = chain.iter().map(|rel| rel.account).collect();
        assert_eq!(unique.len(), chain.len());
    }

    let downline = engine.descendants_of(r, None).await.unwrap();
    let depths: Vec<u32> = downline.iter().map(|m| m.depth).collect();
    let mut sorted = depths.clone();
    sorted.sort_unstable();
    assert_eq!(depths, sorted);
    assert_eq!(downline.len(), 6);

    let summary = engine.team_summary(r, None).await.unwrap();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.levels, vec![(1, 2), (2, 2), (3, 1)]);

    let limited = engine.team_summary(r, Some(1)).await.unwrap();
    assert_eq!(limited.total, 2);
    assert_eq!(limited.levels, vec![(1, 2)]);

    let leaf = engine.team_summary(c, None).await.unwrap();
    assert_eq!(leaf.total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn siblings_attached_concurrently() {
    const SIBLINGS: usize = 30;

    let path = std::env::temp_dir().join(format!("kinship-siblings-{}.db", uuid::Uuid::new_v4()));
    let store = Store::with_pool_options(&format!("sqlite:{}", path.display()), 5, 1)
        .await
        .expect("Failed to open file-backed store");
    let engine = HierarchyEngine::new(store.edge_store());

    let r = account(&store, "R").await;
    engine.attach(r, None).await.unwrap();

    let mut siblings = Vec::with_capacity(SIBLINGS);
    for i in 0..SIBLINGS {
        siblings.push(account(&store, &format!("S{i}")).await);
    }

    let handles: Vec<_> = siblings
        .iter()
        .map(|&child| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.attach(child, Some(r)).await })
        })
        .collect();

    for handle in handles {
        let edges = handle.await.unwrap().unwrap();
        assert_eq!(edges.len(), 2);
    }

    let downline = engine.descendants_of(r, None).await.unwrap();
    assert_eq!(downline.len(), SIBLINGS + 1);
    assert!(downline[1..].iter().all(|rel| rel.depth == 1));

    for &child in &siblings {
        assert_eq!(
            pairs(&engine.ancestors_of(child).await.unwrap()),
            vec![(child, 0), (r, 1)]
        );
    }

    store.conn.close().await.ok();
    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{}{suffix}", path.display())).ok();
    }
}

#[tokio::test]
async fn unattached_account_has_empty_views() {
    let (store, engine) = setup().await;
    let x = account(&store, "X").await;

    assert!(engine.ancestors_of(x).await.unwrap().is_empty());
    assert!(engine.descendants_of(x, None).await.unwrap().is_empty());
    let summary = engine.team_summary(x, None).await.unwrap();
    assert_eq!(summary.total, 0);
    assert!(summary.levels.is_empty());
}
