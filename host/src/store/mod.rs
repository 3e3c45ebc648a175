//! # Store 模块
//!
//! 本地资源持久化：一个 SQLite 文件中的单张键值表。
//!
//! ## 表结构
//!
//! ```text
//! assets
//! ├── key    TEXT PRIMARY KEY
//! └── value  （无类型：TEXT 引用 或 BLOB 原始内容）
//! ```
//!
//! ## 约定
//!
//! - 存储本身是无类型的，`<key>` / `<key>_type` 的配对由 [`SessionStore`] 负责
//! - 每个操作都在独立的事务中完成，并在 tokio 阻塞线程池上执行
//! - 连接按需打开，每次操作都可能重新打开；冲突事务由 SQLite 串行化
//! - 不做重试，也不设操作超时

mod error;
mod session;

pub use error::StoreError;
pub use session::{SESSION_TIMESTAMP_KEY, SessionStore};

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use scene_runtime::{AssetSlot, StoredValue};
use tracing::debug;

use crate::config::StorageConfig;

/// 判断"是否存在上次会话"时检查的键（场景主图）
pub const PRIMARY_KEY: &str = "img";

/// 等待其他连接释放写锁的时长
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS assets (
        key TEXT PRIMARY KEY NOT NULL,
        value
    );
";

/// 异步键值资源存储
#[derive(Debug, Clone)]
pub struct AssetStore {
    /// 数据库文件路径（None 表示当前环境不支持本地存储）
    db_path: Option<PathBuf>,
}

impl AssetStore {
    /// 创建指向 `db_path` 的存储（此时不打开数据库）
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
        }
    }

    /// 创建一个没有本地存储能力的实例
    pub fn unsupported() -> Self {
        Self { db_path: None }
    }

    /// 按配置创建
    pub fn from_config(config: &StorageConfig) -> Self {
        if config.enabled {
            Self::new(&config.db_path)
        } else {
            Self::unsupported()
        }
    }

    /// 数据库文件路径
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// 打开数据库连接
    ///
    /// 首次使用时创建目录与表。
    pub async fn open(&self) -> Result<Connection, StoreError> {
        let path = self.require_path()?;
        let display = path.display().to_string();
        tokio::task::spawn_blocking(move || open_db(&path))
            .await
            .map_err(|e| StoreError::OpenError {
                path: display,
                message: e.to_string(),
            })?
    }

    /// 在一个写事务中保存单个键
    pub async fn save(&self, key: &str, value: impl Into<StoredValue>) -> Result<(), StoreError> {
        self.save_many(vec![(key.to_string(), value.into())]).await
    }

    /// 在同一个写事务中保存多个键（全部成功或全部回滚）
    pub async fn save_many(&self, entries: Vec<(String, StoredValue)>) -> Result<(), StoreError> {
        let path = self.require_path()?;
        let keys = join_keys(entries.iter().map(|(k, _)| k.as_str()));

        let write_keys = keys.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = open_db(&path)?;
            write_entries(&mut conn, &entries).map_err(|e| StoreError::WriteError {
                key: write_keys,
                message: e.to_string(),
            })
        })
        .await
        .map_err(|e| StoreError::WriteError {
            key: keys.clone(),
            message: e.to_string(),
        })?;

        if result.is_ok() {
            debug!(keys = %keys, "资源写入完成");
        }
        result
    }

    /// 在一个读事务中读取单个键，从未写入时返回 None
    pub async fn load(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let mut values = self.load_many(vec![key.to_string()]).await?;
        Ok(values.pop().flatten())
    }

    /// 在同一个读事务中读取多个键，结果与 `keys` 一一对应
    pub async fn load_many(&self, keys: Vec<String>) -> Result<Vec<Option<StoredValue>>, StoreError> {
        let path = self.require_path()?;
        let joined = join_keys(keys.iter().map(String::as_str));

        let read_keys = joined.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open_db(&path)?;
            read_entries(&mut conn, &keys).map_err(|e| StoreError::ReadError {
                key: read_keys,
                message: e.to_string(),
            })
        })
        .await
        .map_err(|e| StoreError::ReadError {
            key: joined,
            message: e.to_string(),
        })?
    }

    /// 在同一个写事务中删除多个键
    pub async fn delete_many(&self, keys: Vec<String>) -> Result<(), StoreError> {
        let path = self.require_path()?;
        let joined = join_keys(keys.iter().map(String::as_str));

        let delete_keys = joined.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open_db(&path)?;
            delete_entries(&mut conn, &keys).map_err(|e| StoreError::WriteError {
                key: delete_keys,
                message: e.to_string(),
            })
        })
        .await
        .map_err(|e| StoreError::WriteError {
            key: joined,
            message: e.to_string(),
        })?
    }

    /// 场景主图是否曾被保存过
    ///
    /// 仅用于界面上"读取上次会话"的提示，任何失败都降级为 `false`。
    pub async fn check_exists(&self) -> bool {
        let Ok(path) = self.require_path() else {
            debug!("本地存储不可用，视为无存档");
            return false;
        };

        let result = tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let conn = open_db(&path)?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM assets WHERE key = ?1",
                    params![PRIMARY_KEY],
                    |row| row.get(0),
                )
                .map_err(|e| StoreError::ReadError {
                    key: PRIMARY_KEY.to_string(),
                    message: e.to_string(),
                })?;
            Ok(count > 0)
        })
        .await;

        match result {
            Ok(Ok(exists)) => exists,
            Ok(Err(e)) => {
                debug!(error = %e, "存档检查失败，视为无存档");
                false
            }
            Err(e) => {
                debug!(error = %e, "存档检查任务失败，视为无存档");
                false
            }
        }
    }

    fn require_path(&self) -> Result<PathBuf, StoreError> {
        self.db_path.clone().ok_or(StoreError::UnsupportedEnvironment)
    }
}

/// 打开（必要时创建）数据库
fn open_db(path: &Path) -> Result<Connection, StoreError> {
    let open_error = |message: String| StoreError::OpenError {
        path: path.display().to_string(),
        message,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| open_error(format!("无法创建目录: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| open_error(e.to_string()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| open_error(e.to_string()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
        .map_err(|e| open_error(e.to_string()))?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| open_error(format!("无法创建表: {}", e)))?;

    Ok(conn)
}

fn write_entries(conn: &mut Connection, entries: &[(String, StoredValue)]) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO assets (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )?;
        for (key, value) in entries {
            stmt.execute(params![key, to_sql(value)])?;
        }
    }
    tx.commit()
}

fn read_entries(conn: &mut Connection, keys: &[String]) -> rusqlite::Result<Vec<Option<StoredValue>>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let mut values = Vec::with_capacity(keys.len());
    {
        let mut stmt = tx.prepare("SELECT value FROM assets WHERE key = ?1")?;
        for key in keys {
            let value = stmt
                .query_row(params![key], |row| row.get::<_, Value>(0))
                .optional()?;
            values.push(value.and_then(from_sql));
        }
    }
    tx.commit()?;
    Ok(values)
}

fn delete_entries(conn: &mut Connection, keys: &[String]) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    {
        let mut stmt = tx.prepare("DELETE FROM assets WHERE key = ?1")?;
        for key in keys {
            stmt.execute(params![key])?;
        }
    }
    tx.commit()
}

fn to_sql(value: &StoredValue) -> Value {
    match value {
        StoredValue::Text(s) => Value::Text(s.clone()),
        StoredValue::Bytes(b) => Value::Blob(b.clone()),
    }
}

/// SQL 值转为存储值（NULL 视为不存在）
fn from_sql(value: Value) -> Option<StoredValue> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(StoredValue::Text(s)),
        Value::Blob(b) => Some(StoredValue::Bytes(b)),
        Value::Integer(i) => Some(StoredValue::Text(i.to_string())),
        Value::Real(f) => Some(StoredValue::Text(f.to_string())),
    }
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    keys.collect::<Vec<_>>().join(",")
}

/// 一个槽位对应的两个键
pub(crate) fn slot_keys(slot: AssetSlot) -> [String; 2] {
    [slot.key().to_string(), slot.type_key()]
}
