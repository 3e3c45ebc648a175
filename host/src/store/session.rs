//! # Session 存档
//!
//! 在无类型的 [`AssetStore`] 之上提供按槽位读写的会话存档。
//!
//! 每个槽位的值与 `_type` 标记总在同一个事务里写入；
//! 整个会话（三个槽位 + 保存时间）也只用一个事务，不会出现只写了一半的存档。

use scene_runtime::{AssetSlot, AssetSource, SessionAssets, StoredValue};
use tracing::{debug, info};

use super::{AssetStore, StoreError, slot_keys};

/// 保存时间的存储键
pub const SESSION_TIMESTAMP_KEY: &str = "saved_at";

/// 会话存档
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: AssetStore,
}

impl SessionStore {
    pub fn new(store: AssetStore) -> Self {
        Self { store }
    }

    /// 底层键值存储
    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// 保存单个槽位（值与标记在同一事务中）
    pub async fn save_slot(&self, slot: AssetSlot, source: &AssetSource) -> Result<(), StoreError> {
        self.store.save_many(slot_entries(slot, source)).await
    }

    /// 读取单个槽位
    pub async fn load_slot(&self, slot: AssetSlot) -> Result<Option<AssetSource>, StoreError> {
        let mut values = self.store.load_many(slot_keys(slot).to_vec()).await?;
        let tag = values.pop().flatten();
        let value = values.pop().flatten();
        decode_slot(slot, value, tag)
    }

    /// 保存整个会话
    ///
    /// 只写入已设置的槽位；所有键和保存时间在同一个事务中提交。
    pub async fn save_session(&self, assets: &SessionAssets) -> Result<(), StoreError> {
        let mut entries: Vec<(String, StoredValue)> = assets
            .entries()
            .flat_map(|(slot, source)| slot_entries(slot, source))
            .collect();
        let slot_count = entries.len() / 2;

        let saved_at = chrono::Local::now().to_rfc3339();
        entries.push((SESSION_TIMESTAMP_KEY.to_string(), StoredValue::Text(saved_at)));

        self.store.save_many(entries).await?;
        info!(slots = slot_count, "会话存档保存成功");
        Ok(())
    }

    /// 读取整个会话，不存在的槽位为 None
    pub async fn load_session(&self) -> Result<SessionAssets, StoreError> {
        let keys: Vec<String> = AssetSlot::ALL.into_iter().flat_map(slot_keys).collect();
        let values = self.store.load_many(keys).await?;

        let mut assets = SessionAssets::default();
        let mut values = values.into_iter();
        for slot in AssetSlot::ALL {
            let value = values.next().flatten();
            let tag = values.next().flatten();
            if let Some(source) = decode_slot(slot, value, tag)? {
                assets.set(slot, source);
            }
        }

        info!(slots = assets.entries().count(), "会话存档读取成功");
        Ok(assets)
    }

    /// 是否存在可读取的上次会话
    pub async fn has_saved_session(&self) -> bool {
        self.store.check_exists().await
    }

    /// 上次保存时间（RFC 3339）
    pub async fn last_saved_at(&self) -> Result<Option<String>, StoreError> {
        let value = self.store.load(SESSION_TIMESTAMP_KEY).await?;
        Ok(value.and_then(|v| v.as_text().map(str::to_string)))
    }

    /// 删除整个会话
    pub async fn clear_session(&self) -> Result<(), StoreError> {
        let mut keys: Vec<String> = AssetSlot::ALL.into_iter().flat_map(slot_keys).collect();
        keys.push(SESSION_TIMESTAMP_KEY.to_string());
        self.store.delete_many(keys).await?;
        info!("会话存档已删除");
        Ok(())
    }
}

fn slot_entries(slot: AssetSlot, source: &AssetSource) -> Vec<(String, StoredValue)> {
    let (value, tag) = source.to_stored();
    vec![(slot.key().to_string(), value), (slot.type_key(), tag)]
}

fn decode_slot(
    slot: AssetSlot,
    value: Option<StoredValue>,
    tag: Option<StoredValue>,
) -> Result<Option<AssetSource>, StoreError> {
    let Some(value) = value else {
        debug!(slot = %slot, "槽位未保存");
        return Ok(None);
    };

    AssetSource::from_stored(value, tag.as_ref())
        .map(Some)
        .map_err(|source| StoreError::InvalidRecord {
            key: slot.key().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_runtime::AssetError;

    fn temp_sessions() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path().join("session.db"));
        (dir, SessionStore::new(store))
    }

    #[tokio::test]
    async fn test_slot_round_trip() {
        let (_dir, sessions) = temp_sessions();
        let content = AssetSource::Content(vec![0x89, b'P', b'N', b'G']);

        sessions.save_slot(AssetSlot::Image, &content).await.unwrap();

        assert_eq!(sessions.load_slot(AssetSlot::Image).await.unwrap(), Some(content));
        assert_eq!(
            sessions.store().load("img_type").await.unwrap(),
            Some(StoredValue::from("blob"))
        );
        assert_eq!(sessions.load_slot(AssetSlot::Video).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let (_dir, sessions) = temp_sessions();
        assert!(!sessions.has_saved_session().await);
        assert_eq!(sessions.last_saved_at().await.unwrap(), None);

        let assets = SessionAssets {
            image: Some(AssetSource::reference("https://example.com/scene.jpg")),
            video: Some(AssetSource::Content(vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p'])),
            landing: Some(AssetSource::reference("/finale.mp4")),
        };
        sessions.save_session(&assets).await.unwrap();

        assert!(sessions.has_saved_session().await);
        assert!(sessions.last_saved_at().await.unwrap().is_some());
        assert_eq!(sessions.load_session().await.unwrap(), assets);
    }

    #[tokio::test]
    async fn test_partial_session() {
        let (_dir, sessions) = temp_sessions();
        let assets = SessionAssets {
            video: Some(AssetSource::reference("v.mp4")),
            ..SessionAssets::default()
        };
        sessions.save_session(&assets).await.unwrap();

        let loaded = sessions.load_session().await.unwrap();
        assert_eq!(loaded, assets);
        assert!(!sessions.has_saved_session().await);
    }

    #[tokio::test]
    async fn test_mismatched_tag_is_invalid() {
        let (_dir, sessions) = temp_sessions();
        sessions.store().save("landing", "finale.png").await.unwrap();
        sessions.store().save("landing_type", "blob").await.unwrap();

        let err = sessions.load_slot(AssetSlot::Landing).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidRecord {
                source: AssetError::TagMismatch { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_clear_session() {
        let (_dir, sessions) = temp_sessions();
        sessions
            .save_session(&SessionAssets::with_defaults())
            .await
            .unwrap();
        assert!(sessions.has_saved_session().await);

        sessions.clear_session().await.unwrap();
        assert!(!sessions.has_saved_session().await);
        assert!(sessions.load_session().await.unwrap().is_empty());
        assert_eq!(sessions.last_saved_at().await.unwrap(), None);
    }
}
