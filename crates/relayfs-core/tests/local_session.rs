//! Session operations against the local host, inside a scratch directory.
#![cfg(unix)]

use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use relayfs_core::{
    AccessMode, ConnectionOptions, FsPath, OpenOptions, Session, SessionRegistry, VfsError,
};

struct Fixture {
    dir: TempDir,
    session: Arc<Session>,
    base: FsPath,
}

async fn setup() -> Fixture {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let dir = TempDir::new().unwrap();
    let registry = SessionRegistry::default();
    let session = registry.open("local:///", ConnectionOptions::new()).await.unwrap();
    let base = session.path(&dir.path().to_string_lossy(), &[]);
    Fixture {
        dir,
        session,
        base,
    }
}

#[tokio::test]
async fn test_create_dir() {
    let f = setup().await;
    let dir = f.base.resolve_str("reports");

    f.session.create_dir(&dir).await.unwrap();
    assert!(f.session.exists(&dir).await.unwrap());
    assert!(f.session.read_attributes(&dir).await.unwrap().is_directory());

    assert!(matches!(
        f.session.create_dir(&dir).await,
        Err(VfsError::AlreadyExists(_))
    ));

    let orphan = f.base.resolve_str("missing/child");
    let err = f.session.create_dir(&orphan).await.unwrap_err();
    assert!(matches!(err, VfsError::Io(_)));
}

#[tokio::test]
async fn test_channel_round_trip() {
    let f = setup().await;
    let file = f.base.resolve_str("notes.txt");

    let mut out = f.session.open_channel(&file, &OpenOptions::create()).await.unwrap();
    out.write(b"first line\n").await.unwrap();
    out.write(b"second line\n").await.unwrap();
    out.close().await;

    let mut input = f.session.open_channel(&file, &OpenOptions::read()).await.unwrap();
    let mut text = String::new();
    input.read_to_string(&mut text).await.unwrap();
    input.close().await;
    assert_eq!(text, "first line\nsecond line\n");

    let attrs = f.session.read_attributes(&file).await.unwrap();
    assert!(attrs.is_regular_file());
    assert_eq!(attrs.size(), 23);
    assert_eq!(attrs.creation_time(), attrs.last_modified_time());
    assert!(attrs.file_key().is_none());
}

#[tokio::test]
async fn test_read_dir_with_filter() {
    let f = setup().await;
    for name in ["a.log", "b.txt", "c.log"] {
        std::fs::write(f.dir.path().join(name), name).unwrap();
    }

    let logs: Vec<String> = f
        .session
        .read_dir(&f.base, |p| Ok(p.to_string().ends_with(".log")))
        .await
        .unwrap()
        .map(|p| p.file_name().unwrap().to_string())
        .collect();
    assert_eq!(logs, vec!["a.log", "c.log"]);

    let file = f.base.resolve_str("b.txt");
    assert!(matches!(
        f.session.read_dir(&file, |_| Ok(true)).await,
        Err(VfsError::NotADirectory(_))
    ));
}

#[tokio::test]
async fn test_delete() {
    let f = setup().await;
    let file = f.base.resolve_str("scratch.bin");
    std::fs::write(f.dir.path().join("scratch.bin"), [0u8; 8]).unwrap();

    f.session.delete(&file).await.unwrap();
    assert!(!f.session.exists(&file).await.unwrap());
    assert!(matches!(f.session.delete(&file).await, Err(VfsError::NotFound(_))));
}

#[tokio::test]
async fn test_access_and_hidden() {
    use std::os::unix::fs::PermissionsExt;

    let f = setup().await;
    let script = f.dir.path().join("build.sh");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o700)).unwrap();

    let path = f.base.resolve_str("build.sh");
    f.session
        .check_access(&path, &[AccessMode::Read, AccessMode::Write, AccessMode::Execute])
        .await
        .unwrap();

    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o600)).unwrap();
    let err = f.session.check_access(&path, &[AccessMode::Execute]).await.unwrap_err();
    assert!(matches!(err, VfsError::AccessDenied { reason, .. } if reason == "Can not execute"));

    let missing = f.base.resolve_str("nope");
    assert!(matches!(
        f.session.check_access(&missing, &[]).await,
        Err(VfsError::NotFound(_))
    ));

    assert!(f.session.is_hidden(&f.base.resolve_str(".foo")).await.unwrap());
    assert!(!f.session.is_hidden(&path).await.unwrap());
}

#[tokio::test]
async fn test_parent_walk_reaches_root() {
    let f = setup().await;
    let mut current = f.session.path("/first/second/third", &[]);
    let mut steps = 0;
    while let Some(parent) = current.parent() {
        current = parent;
        steps += 1;
    }
    assert_eq!(steps, 3);
    assert_eq!(current, f.session.root());
}
