//! End-to-end behaviour of the filesystem over an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use prism_storage::{KvStore, MemoryKvStore};
use prism_vfs::{Content, FileIndex, INDEX_PATH, Meta, PermissionSet, Vfs};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (Arc<MemoryKvStore>, Vfs) {
    let store = Arc::new(MemoryKvStore::new());
    let vfs = Vfs::new(Arc::clone(&store) as Arc<dyn KvStore>);
    (store, vfs)
}

fn user() -> PermissionSet {
    PermissionSet::user()
}

fn guest() -> PermissionSet {
    PermissionSet::from_iter(["guest"])
}

async fn children(vfs: &Vfs, path: &str) -> Vec<String> {
    vfs.list_dir(path, &user()).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Tree consistency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_make_dir_builds_every_ancestor() {
    let (_store, vfs) = setup();
    vfs.make_dir("/a/b/c", &user(), Meta::new()).await.unwrap();

    assert!(vfs.exists("/a").await.unwrap());
    assert!(vfs.exists("/a/b").await.unwrap());
    assert!(vfs.exists("/a/b/c").await.unwrap());
    assert_eq!(children(&vfs, "/").await, vec!["/a"]);
    assert_eq!(children(&vfs, "/a").await, vec!["/a/b"]);
    assert_eq!(children(&vfs, "/a/b").await, vec!["/a/b/c"]);
    assert!(children(&vfs, "/a/b/c").await.is_empty());
}

#[tokio::test]
async fn test_parent_lists_child_exactly_once() {
    let (_store, vfs) = setup();
    for _ in 0..3 {
        vfs.make_dir("/docs", &user(), Meta::new()).await.unwrap();
        vfs.write_file("/docs/readme.txt", "hi", &user(), Meta::new())
            .await
            .unwrap();
    }
    let listed = children(&vfs, "/docs").await;
    assert_eq!(listed, vec!["/docs/readme.txt"]);
    assert_eq!(children(&vfs, "/").await, vec!["/docs"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_into_one_directory_keep_every_link() {
    let (_store, vfs) = setup();
    let vfs = Arc::new(vfs);
    vfs.make_dir("/shared", &user(), Meta::new()).await.unwrap();

    let writes = (0..32).map(|i| {
        let vfs = Arc::clone(&vfs);
        tokio::spawn(async move {
            vfs.write_file(&format!("/shared/f{i}"), "x", &user(), Meta::new())
                .await
                .unwrap();
        })
    });
    for handle in futures::future::join_all(writes).await {
        handle.unwrap();
    }

    let mut listed = children(&vfs, "/shared").await;
    listed.sort();
    listed.dedup();
    assert_eq!(listed.len(), 32);
    assert_eq!(vfs.index().len(), 32);
}

#[tokio::test]
async fn test_recursive_delete_clears_store_and_index() {
    let (store, vfs) = setup();
    vfs.write_file("/proj/src/main.txt", "fn", &user(), Meta::new())
        .await
        .unwrap();
    vfs.write_file("/proj/notes.txt", "n", &user(), Meta::new())
        .await
        .unwrap();
    vfs.make_dir("/proj/empty", &user(), Meta::new()).await.unwrap();
    assert_eq!(vfs.index().len(), 2);

    vfs.delete_file("/proj", &user()).await.unwrap();

    assert!(vfs.list_dir("/proj", &user()).await.unwrap().is_none());
    let keys = store.list_keys().await.unwrap();
    assert_eq!(keys, vec!["/"]);
    assert!(vfs.index().is_empty());
    assert!(children(&vfs, "/").await.is_empty());
}

#[tokio::test]
async fn test_delete_missing_path_is_noop() {
    let (_store, vfs) = setup();
    vfs.make_dir("/x", &user(), Meta::new()).await.unwrap();
    vfs.delete_file("/x/nothing", &user()).await.unwrap();
    assert!(vfs.exists("/x").await.unwrap());
}

#[tokio::test]
async fn test_delete_updates_parent_modified() {
    let (_store, vfs) = setup();
    vfs.write_file("/d/f.txt", "x", &user(), Meta::new()).await.unwrap();
    let before = vfs.stat("/d", &user()).await.unwrap().unwrap().modified;
    tokio::time::sleep(Duration::from_millis(5)).await;
    vfs.delete_file("/d/f.txt", &user()).await.unwrap();
    let after = vfs.stat("/d", &user()).await.unwrap().unwrap().modified;
    assert!(after > before);
}

#[tokio::test]
async fn test_delete_keeps_directory_holding_protected_children() {
    let (store, vfs) = setup();
    let public = PermissionSet::public();
    vfs.make_dir("/d", &public, Meta::new()).await.unwrap();
    vfs.write_file("/d/mine", "m", &user(), Meta::new()).await.unwrap();
    vfs.write_file("/d/admin", "a", &PermissionSet::administrator(), Meta::new())
        .await
        .unwrap();

    vfs.delete_file("/d", &user()).await.unwrap();

    // The caller's own child goes; the directory stays to keep the protected
    // child linked.
    assert!(!vfs.exists("/d/mine").await.unwrap());
    assert!(vfs.exists("/d/admin").await.unwrap());
    assert_eq!(children(&vfs, "/d").await, vec!["/d/admin"]);
    assert_eq!(children(&vfs, "/").await, vec!["/d"]);
    assert!(vfs.index().get("/d/mine").is_none());
    assert!(vfs.index().get("/d/admin").is_some());
    assert!(!store.list_keys().await.unwrap().contains(&"/d/mine".to_owned()));
}

// ---------------------------------------------------------------------------
// Timestamps and mimetypes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_overwrite_keeps_created_and_bumps_modified() {
    let (_store, vfs) = setup();
    vfs.write_file("/t.txt", "one", &user(), Meta::new()).await.unwrap();
    let first = vfs.get_file_data("/t.txt", &user()).await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    vfs.write_file("/t.txt", "two", &user(), Meta::new()).await.unwrap();
    let second = vfs.get_file_data("/t.txt", &user()).await.unwrap().unwrap();

    assert_eq!(first.created, second.created);
    assert!(second.modified > first.modified);
    assert_eq!(second.content(), Some(&Content::from("two")));
    assert_eq!(vfs.index().get("/t.txt").unwrap().modified, second.modified);
}

#[tokio::test]
async fn test_mimetype_comes_from_content() {
    let (_store, vfs) = setup();
    vfs.write_file("/pic.txt", vec![0x89_u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A], &user(), Meta::new())
        .await
        .unwrap();
    vfs.write_file("/data.bin", r#"{"a":1}"#, &user(), Meta::new())
        .await
        .unwrap();

    let pic = vfs.get_file_data("/pic.txt", &user()).await.unwrap().unwrap();
    let data = vfs.get_file_data("/data.bin", &user()).await.unwrap().unwrap();
    assert_eq!(pic.mimetype(), Some("image/png"));
    assert_eq!(data.mimetype(), Some("application/json"));
    assert_eq!(vfs.index().get("/pic.txt").unwrap().mimetype, "image/png");
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tagged_node_hides_from_non_overlapping_caller() {
    let (_store, vfs) = setup();
    vfs.write_file("/secret.txt", "s", &user(), Meta::new()).await.unwrap();

    assert!(vfs.get_file("/secret.txt", &user()).await.unwrap().is_some());
    assert!(vfs.get_file("/secret.txt", &guest()).await.unwrap().is_none());
    assert!(vfs.list_dir("/", &guest()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_untagged_node_is_public() {
    let (_store, vfs) = setup();
    vfs.make_dir("/", &PermissionSet::public(), Meta::new()).await.unwrap();
    vfs.write_file("/open.txt", "o", &PermissionSet::public(), Meta::new())
        .await
        .unwrap();
    assert!(vfs.get_file("/open.txt", &guest()).await.unwrap().is_some());
    assert!(vfs.get_file("/open.txt", &user()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_denied_write_and_delete_have_no_effect() {
    let (_store, vfs) = setup();
    vfs.write_file("/mine.txt", "original", &user(), Meta::new())
        .await
        .unwrap();

    vfs.write_file("/mine.txt", "hijack", &guest(), Meta::new())
        .await
        .unwrap();
    vfs.delete_file("/mine.txt", &guest()).await.unwrap();

    assert_eq!(
        vfs.get_file("/mine.txt", &user()).await.unwrap(),
        Some(Content::from("original"))
    );
}

// ---------------------------------------------------------------------------
// Index persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_index_survives_flush_and_reload() {
    let (store, vfs) = setup();
    vfs.write_file("/home/Report.txt", "r", &user(), Meta::new())
        .await
        .unwrap();
    vfs.index().flush(&vfs).await.unwrap();
    assert!(vfs.exists(INDEX_PATH).await.unwrap());

    let reopened = Vfs::with_index(store as Arc<dyn KvStore>, Arc::new(FileIndex::new()));
    reopened.index().load(&reopened).await.unwrap();
    let hits = reopened.index().search("report");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/home/Report.txt");
}

#[tokio::test]
async fn test_load_without_snapshot_is_empty() {
    let (_store, vfs) = setup();
    vfs.index().load(&vfs).await.unwrap();
    assert!(vfs.index().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_autosave_flushes_on_interval() {
    let (_store, vfs) = setup();
    let vfs = Arc::new(vfs);
    let task = prism_vfs::spawn_autosave(Arc::clone(&vfs), Duration::from_secs(30));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(vfs.exists(INDEX_PATH).await.unwrap());

    vfs.write_file("/late.txt", "l", &user(), Meta::new()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(31)).await;
    let snapshot = vfs.get_file(INDEX_PATH, &user()).await.unwrap().unwrap();
    let Content::Json(value) = snapshot else {
        panic!("index snapshot should be structured content");
    };
    assert!(value.get("/late.txt").is_some());

    task.abort();
}
