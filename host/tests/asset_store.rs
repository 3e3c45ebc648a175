//! # 资源存储集成测试
//!
//! 测试 AssetStore → SessionStore 的持久化链路。
//! 每个测试使用独立的临时数据库文件。

use scene_host::{AssetStore, SessionStore, StoreError};
use scene_runtime::{AssetSlot, AssetSource, SessionAssets, StoredValue};

/// 创建测试用的存储（临时目录随返回值一起释放）
fn temp_store() -> (tempfile::TempDir, AssetStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AssetStore::new(dir.path().join("saves").join("assets.db"));
    (dir, store)
}

/// 值与类型标记成对保存、成对读取
#[tokio::test]
async fn test_value_and_tag_round_trip() {
    let (_dir, store) = temp_store();
    let bytes: Vec<u8> = (0..=255).collect();

    store.save("vid", bytes.clone()).await.unwrap();
    store.save("vid_type", "blob").await.unwrap();

    assert_eq!(store.load("vid").await.unwrap(), Some(StoredValue::Bytes(bytes)));
    assert_eq!(store.load("vid_type").await.unwrap(), Some(StoredValue::from("blob")));
}

/// 数据在重新打开连接后仍然存在
#[tokio::test]
async fn test_persists_across_instances() {
    let (dir, store) = temp_store();
    store.save("img", "https://example.com/a.jpg").await.unwrap();

    let reopened = AssetStore::new(dir.path().join("saves").join("assets.db"));
    assert!(reopened.check_exists().await);
    assert_eq!(
        reopened.load("img").await.unwrap(),
        Some(StoredValue::from("https://example.com/a.jpg"))
    );
}

/// 多个连接并发写入不同键
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers() {
    let (_dir, store) = temp_store();
    store.open().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.save(&format!("key_{i}"), format!("value_{i}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..8 {
        assert_eq!(
            store.load(&format!("key_{i}")).await.unwrap(),
            Some(StoredValue::Text(format!("value_{i}")))
        );
    }
}

/// 会话存档是原子的：写入中途失败时所有槽位保持旧值
#[tokio::test]
async fn test_failed_session_save_is_atomic() {
    let (_dir, store) = temp_store();
    let sessions = SessionStore::new(store.clone());

    let previous = SessionAssets::with_defaults();
    sessions.save_session(&previous).await.unwrap();

    // 拒绝写入 landing 槽位，模拟事务中途失败
    let conn = store.open().await.unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_landing BEFORE INSERT ON assets
         WHEN NEW.key = 'landing'
         BEGIN SELECT RAISE(ABORT, 'landing rejected'); END;
         CREATE TRIGGER reject_landing_update BEFORE UPDATE ON assets
         WHEN NEW.key = 'landing'
         BEGIN SELECT RAISE(ABORT, 'landing rejected'); END;",
    )
    .unwrap();
    drop(conn);

    let replacement = SessionAssets {
        image: Some(AssetSource::Content(vec![1, 2, 3])),
        video: Some(AssetSource::reference("new.mp4")),
        landing: Some(AssetSource::reference("new.png")),
    };
    let err = sessions.save_session(&replacement).await.unwrap_err();
    assert!(matches!(err, StoreError::WriteError { .. }));

    assert_eq!(sessions.load_session().await.unwrap(), previous);
}

/// 单槽位写入同样不会只留下值或只留下标记
#[tokio::test]
async fn test_failed_slot_save_leaves_no_partial_record() {
    let (_dir, store) = temp_store();
    let sessions = SessionStore::new(store.clone());

    let conn = store.open().await.unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_tag BEFORE INSERT ON assets
         WHEN NEW.key = 'img_type'
         BEGIN SELECT RAISE(ABORT, 'tag rejected'); END;",
    )
    .unwrap();
    drop(conn);

    let result = sessions
        .save_slot(AssetSlot::Image, &AssetSource::reference("scene.jpg"))
        .await;
    assert!(matches!(result, Err(StoreError::WriteError { .. })));

    assert_eq!(store.load("img").await.unwrap(), None);
    assert!(!store.check_exists().await);
}

/// 关闭本地存储后，操作返回 UnsupportedEnvironment，检查降级为 false
#[tokio::test]
async fn test_disabled_storage() {
    let config = scene_host::StorageConfig {
        enabled: false,
        ..Default::default()
    };
    let sessions = SessionStore::new(AssetStore::from_config(&config));

    assert!(!sessions.has_saved_session().await);
    assert!(matches!(
        sessions.load_session().await,
        Err(StoreError::UnsupportedEnvironment)
    ));
    assert!(matches!(
        sessions.save_session(&SessionAssets::with_defaults()).await,
        Err(StoreError::UnsupportedEnvironment)
    ));
}
