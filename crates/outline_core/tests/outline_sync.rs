use async_trait::async_trait;
use outline_core::{
    Address, CreatedRecord, DeleteOutcome, MemoryRemote, NodeId, NodeRecord, OutlineError,
    OutlineRemote, OutlineTree, RemoteError, RemoteMethod, RemoteResult, RenameRecord,
};
use std::collections::HashSet;
use std::sync::Arc;

async fn hydrate(remote: MemoryRemote) -> OutlineTree<MemoryRemote> {
    OutlineTree::hydrate(remote, MemoryRemote::root_address())
        .await
        .unwrap()
}

/// Index path of every live node, derived from the tree structure.
fn index_paths<R: OutlineRemote>(tree: &OutlineTree<R>) -> Vec<(NodeId, Vec<usize>)> {
    let mut out = Vec::new();
    let mut pending = vec![(tree.root(), Vec::new())];
    while let Some((id, path)) = pending.pop() {
        let node = tree.node(id).unwrap();
        for (index, child) in node.children().iter().enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(index);
            pending.push((*child, child_path));
        }
        out.push((id, path));
    }
    out
}

/// Index path spelled by an address: numeric segments after the prefix.
fn address_path(address: &Address) -> Vec<usize> {
    address
        .segments()
        .skip(1)
        .map(|segment| segment.parse().unwrap())
        .collect()
}

fn assert_addresses_match_positions<R: OutlineRemote>(tree: &OutlineTree<R>) {
    let mut seen = HashSet::new();
    for (id, path) in index_paths(tree) {
        let node = tree.node(id).unwrap();
        assert_eq!(
            address_path(node.address()),
            path,
            "address {} does not match position",
            node.address()
        );
        assert!(
            seen.insert(path),
            "duplicate position for {}",
            node.address()
        );
    }
}

fn address_of<R: OutlineRemote>(tree: &OutlineTree<R>, id: NodeId) -> String {
    tree.node(id).unwrap().address().as_str().to_string()
}

#[tokio::test]
async fn hydrate_reproduces_server_shape_labels_and_addresses() {
    let remote = MemoryRemote::new();
    remote.seed_uniform(3, 3);
    let tree = hydrate(remote).await;

    assert_eq!(tree.len(), 1 + 3 + 9 + 27);
    for (id, path) in index_paths(&tree) {
        let node = tree.node(id).unwrap();
        assert_eq!(Some(node.label().to_string()), tree.remote().label_at(&path));
        assert_eq!(
            Some(node.children().len()),
            tree.remote().child_count(&path)
        );
        let expected = std::iter::once("/outline".to_string())
            .chain(path.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("/")
            + "/";
        assert_eq!(node.address().as_str(), expected);
    }
    assert_addresses_match_positions(&tree);
}

#[tokio::test]
async fn hydrate_fetches_depth_first_in_display_order() {
    let remote = MemoryRemote::new();
    remote.seed_uniform(2, 2);
    let tree = hydrate(remote).await;

    let fetched: Vec<String> = tree
        .remote()
        .calls()
        .into_iter()
        .map(|call| {
            assert_eq!(call.method, RemoteMethod::Get);
            call.address.into_string()
        })
        .collect();
    assert_eq!(
        fetched,
        vec![
            "/outline/",
            "/outline/0/",
            "/outline/0/0/",
            "/outline/0/1/",
            "/outline/1/",
            "/outline/1/0/",
            "/outline/1/1/",
        ]
    );
}

#[tokio::test]
async fn hydrate_links_parents() {
    let remote = MemoryRemote::new();
    remote.seed_uniform(2, 2);
    let tree = hydrate(remote).await;

    let root = tree.root();
    assert!(tree.node(root).unwrap().is_root());
    for (id, _) in tree.walk().into_iter().skip(1) {
        let parent = tree.node(id).unwrap().parent().unwrap();
        assert!(tree.node(parent).unwrap().children().contains(&id));
    }
}

#[tokio::test]
async fn hydrate_failure_reports_fetch_error() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "a").unwrap();
    remote.fail_next(RemoteMethod::Get, 503);
    let err = OutlineTree::hydrate(remote, MemoryRemote::root_address())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        OutlineError::Fetch {
            source: RemoteError::Status { status: 503, .. },
            ..
        }
    ));

    let err = OutlineTree::hydrate(MemoryRemote::new(), "/outline/7/")
        .await
        .err()
        .unwrap();
    match err {
        OutlineError::Fetch { address, source } => {
            assert_eq!(address.as_str(), "/outline/7/");
            assert!(matches!(source, RemoteError::Status { status: 404, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn delete_middle_child_renumbers_following_siblings() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "first").unwrap();
    remote.seed(&[], "second").unwrap();
    remote.seed(&[], "third").unwrap();
    remote.seed(&[2], "third.a").unwrap();
    remote.seed(&[2, 0], "third.a.a").unwrap();
    let mut tree = hydrate(remote).await;
    let root = tree.root();

    // Bring children to client-side spelling: /outline//0, /outline//1, ...
    assert_eq!(tree.renumber(root, 0).unwrap(), 3);
    let first = tree.child(root, 0).unwrap();
    let second = tree.child(root, 1).unwrap();
    let third = tree.child(root, 2).unwrap();
    assert_eq!(address_of(&tree, first), "/outline//0");
    assert_eq!(address_of(&tree, second), "/outline//1");
    assert_eq!(address_of(&tree, third), "/outline//2");

    let outcome = tree.delete(second).await.unwrap();
    assert_eq!(
        outcome,
        DeleteOutcome::Detached {
            parent: root,
            index: 1,
            renumbered: 1,
        }
    );

    assert_eq!(tree.node(root).unwrap().children(), &[first, third]);
    assert!(!tree.contains(second));
    assert_eq!(address_of(&tree, first), "/outline//0");
    assert_eq!(address_of(&tree, third), "/outline//1");
    let third_a = tree.child(third, 0).unwrap();
    let third_a_a = tree.child(third_a, 0).unwrap();
    assert_eq!(address_of(&tree, third_a), "/outline//1/0");
    assert_eq!(address_of(&tree, third_a_a), "/outline//1/0/0");

    assert_eq!(
        tree.remote().calls().last().unwrap().address.as_str(),
        "/outline//1"
    );
    assert_eq!(tree.remote().label_at(&[1]).as_deref(), Some("third"));
    assert_addresses_match_positions(&tree);
}

#[tokio::test]
async fn delete_last_child_performs_no_renumbering() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "a").unwrap();
    remote.seed(&[], "b").unwrap();
    let mut tree = hydrate(remote).await;
    let root = tree.root();
    let a = tree.child(root, 0).unwrap();
    let b = tree.child(root, 1).unwrap();

    let outcome = tree.delete(b).await.unwrap();
    assert_eq!(
        outcome,
        DeleteOutcome::Detached {
            parent: root,
            index: 1,
            renumbered: 0,
        }
    );
    assert_eq!(address_of(&tree, a), "/outline/0/");
    assert_eq!(tree.node(root).unwrap().children(), &[a]);
}

#[tokio::test]
async fn repeated_deletes_keep_addresses_positional_and_in_sync() {
    let remote = MemoryRemote::new();
    remote.seed_uniform(3, 3);
    let mut tree = hydrate(remote).await;
    let root = tree.root();

    for (parent_path, index) in [
        (vec![], 0usize),
        (vec![1], 1),
        (vec![0, 2], 0),
        (vec![], 1),
        (vec![0], 0),
    ] {
        let mut parent = root;
        for step in &parent_path {
            parent = tree.child(parent, *step).unwrap();
        }
        let target = tree.child(parent, index).unwrap();
        tree.delete(target).await.unwrap();
        assert_addresses_match_positions(&tree);
    }

    // The server agrees with the client about what lives where.
    let local: Vec<(String, Vec<usize>)> = index_paths(&tree)
        .into_iter()
        .map(|(id, path)| (tree.node(id).unwrap().label().to_string(), path))
        .collect();
    for (label, path) in &local {
        assert_eq!(tree.remote().label_at(path).as_ref(), Some(label));
    }
    assert_eq!(local.len(), tree.len());
}

#[tokio::test]
async fn failed_delete_leaves_tree_unchanged() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "a").unwrap();
    remote.seed(&[], "b").unwrap();
    let mut tree = hydrate(remote).await;
    let root = tree.root();
    let a = tree.child(root, 0).unwrap();

    tree.remote().fail_next(RemoteMethod::Delete, 500);
    let err = tree.delete(a).await.unwrap_err();
    assert!(matches!(err, OutlineError::Delete { .. }));
    assert!(tree.contains(a));
    assert_eq!(tree.node(root).unwrap().children().len(), 2);
    assert_eq!(address_of(&tree, tree.child(root, 1).unwrap()), "/outline/1/");
}

#[tokio::test]
async fn create_child_appends_with_server_address() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "a").unwrap();
    remote.seed(&[0], "a.a").unwrap();
    let mut tree = hydrate(remote).await;
    let root = tree.root();
    let a = tree.child(root, 0).unwrap();
    let existing = tree.child(a, 0).unwrap();

    let created = tree.create_child(a).await.unwrap();
    let node = tree.node(created).unwrap();
    assert_eq!(node.address().as_str(), "/outline/0/1");
    assert_eq!(node.label(), "outline");
    assert_eq!(node.parent(), Some(a));
    assert_eq!(tree.node(a).unwrap().children(), &[existing, created]);
    assert_eq!(address_of(&tree, existing), "/outline/0/0/");
    assert_eq!(tree.remote().child_count(&[0]), Some(2));
    assert_eq!(tree.len(), 4);
}

#[tokio::test]
async fn create_child_failure_keeps_children() {
    let mut tree = hydrate(MemoryRemote::new()).await;
    let root = tree.root();
    tree.remote().fail_next(RemoteMethod::Post, 500);

    let err = tree.create_child(root).await.unwrap_err();
    match err {
        OutlineError::Create { address, .. } => assert_eq!(address.as_str(), "/outline/"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(tree.node(root).unwrap().children().is_empty());
}

#[tokio::test]
async fn rename_with_current_or_blank_label_is_a_no_op() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "Groceries").unwrap();
    let mut tree = hydrate(remote).await;
    let node = tree.child(tree.root(), 0).unwrap();
    tree.remote().clear_calls();

    assert!(!tree.rename(node, "Groceries").await.unwrap());
    assert!(!tree.rename(node, "  Groceries ").await.unwrap());
    assert!(!tree.rename(node, "").await.unwrap());
    assert!(!tree.rename(node, "   ").await.unwrap());

    assert!(tree.remote().calls().is_empty());
    assert_eq!(tree.node(node).unwrap().label(), "Groceries");
}

#[tokio::test]
async fn rename_stores_label_returned_by_server() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "draft").unwrap();
    remote.rewrite_labels_with(|name| name.to_uppercase());
    let mut tree = hydrate(remote).await;
    let node = tree.child(tree.root(), 0).unwrap();

    assert!(tree.rename(node, " shopping ").await.unwrap());
    assert_eq!(tree.node(node).unwrap().label(), "SHOPPING");
    assert_eq!(tree.remote().label_at(&[0]).as_deref(), Some("SHOPPING"));
    assert_eq!(tree.remote().call_count(RemoteMethod::Put), 1);
}

#[tokio::test]
async fn rename_failure_keeps_previous_label() {
    let remote = MemoryRemote::new();
    remote.seed(&[], "keep").unwrap();
    let mut tree = hydrate(remote).await;
    let node = tree.child(tree.root(), 0).unwrap();
    tree.remote().fail_next(RemoteMethod::Put, 500);

    let err = tree.rename(node, "lost").await.unwrap_err();
    assert!(matches!(err, OutlineError::Rename { .. }));
    assert_eq!(tree.node(node).unwrap().label(), "keep");
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn shared_remote_observes_every_operation() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(&[], "a").unwrap();
    let mut tree = OutlineTree::hydrate(Arc::clone(&remote), MemoryRemote::root_address())
        .await
        .unwrap();
    let root = tree.root();

    let created = tree.create_child(root).await.unwrap();
    tree.rename(created, "b").await.unwrap();
    tree.delete(tree.child(root, 0).unwrap()).await.unwrap();

    let methods: Vec<RemoteMethod> = remote.calls().into_iter().map(|call| call.method).collect();
    assert_eq!(
        methods,
        vec![
            RemoteMethod::Get,
            RemoteMethod::Get,
            RemoteMethod::Post,
            RemoteMethod::Put,
            RemoteMethod::Delete,
        ]
    );
    assert_eq!(remote.label_at(&[0]).as_deref(), Some("b"));
    assert_eq!(address_of(&tree, created), "/outline//0");
}

/// Remote that serves a lone root and accepts every delete.
struct PermissiveRoot;

#[async_trait]
impl OutlineRemote for PermissiveRoot {
    async fn fetch(&self, address: &Address) -> RemoteResult<NodeRecord> {
        Ok(NodeRecord {
            url: address.clone(),
            name: "root".to_string(),
            children: Vec::new(),
        })
    }

    async fn create(&self, parent: &Address) -> RemoteResult<CreatedRecord> {
        Ok(CreatedRecord {
            url: parent.child(0),
            name: "child".to_string(),
        })
    }

    async fn rename(&self, _address: &Address, name: &str) -> RemoteResult<RenameRecord> {
        Ok(RenameRecord {
            name: name.to_string(),
        })
    }

    async fn delete(&self, _address: &Address) -> RemoteResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn deleting_root_is_a_local_no_op() {
    let mut tree = OutlineTree::hydrate(PermissiveRoot, "/outline/")
        .await
        .unwrap();
    let root = tree.root();
    let child = tree.create_child(root).await.unwrap();

    let outcome = tree.delete(root).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::RootUnchanged);
    assert!(tree.contains(root));
    assert!(tree.contains(child));
    assert_eq!(tree.len(), 2);
    assert_eq!(address_of(&tree, child), "/outline//0");
}
