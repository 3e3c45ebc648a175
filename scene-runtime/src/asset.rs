//! # Asset 模块
//!
//! 场景配置所用媒体资源的数据模型。
//!
//! ## 存储约定
//!
//! 底层存储是无类型的键值对。每个槽位占用两个键：
//!
//! ```text
//! img        -> 资源值（字符串引用 或 原始字节）
//! img_type   -> "url" | "blob"
//! vid / vid_type
//! landing / landing_type
//! ```
//!
//! 值与标记必须一起读写，[`AssetSource`] 把这对键折叠为一个带标签的变体。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, ParseError};

/// 启动时的场景主图
pub const INITIAL_IMAGE_SRC: &str = "/pickerel.jpg";
/// 配置页中场景图片的占位引用
pub const DEFAULT_IMAGE_SRC: &str = "https://images.unsplash.com/photo-1533552024785-5db438e6e582?q=80&w=2670&auto=format&fit=crop";
/// 默认过场视频
pub const DEFAULT_VIDEO_SRC: &str =
    "https://cdn.midjourney.com/video/0d51ccad-768a-472f-b02b-322f96b04d65/0.mp4";
/// 默认终幕媒体
pub const DEFAULT_LANDING_SRC: &str =
    "https://cdn.midjourney.com/video/77107015-92ec-43ec-bf3c-855d4dea4bb4/2.mp4";

/// 引用类型标记
pub const TAG_REFERENCE: &str = "url";
/// 原始内容类型标记
pub const TAG_CONTENT: &str = "blob";

/// 存储层的原始值
///
/// 存储本身不理解类型，只区分字符串与字节。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl StoredValue {
    /// 以字符串形式读取（字节值返回 None）
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Bytes(_) => None,
        }
    }

    /// 值形态的描述（用于错误信息）
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "字符串",
            Self::Bytes(_) => "字节内容",
        }
    }
}

impl From<&str> for StoredValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// 资源槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSlot {
    /// 场景主图
    Image,
    /// 过场视频
    Video,
    /// 终幕媒体（图片或视频）
    Landing,
}

impl AssetSlot {
    /// 全部槽位，按保存顺序排列
    pub const ALL: [AssetSlot; 3] = [AssetSlot::Image, AssetSlot::Video, AssetSlot::Landing];

    /// 存储键
    pub fn key(self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Video => "vid",
            Self::Landing => "landing",
        }
    }

    /// 类型标记键（`<key>_type`）
    pub fn type_key(self) -> String {
        format!("{}_type", self.key())
    }

    /// 启动时使用的引用
    pub fn default_reference(self) -> &'static str {
        match self {
            Self::Image => INITIAL_IMAGE_SRC,
            Self::Video => DEFAULT_VIDEO_SRC,
            Self::Landing => DEFAULT_LANDING_SRC,
        }
    }
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AssetSlot {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "img" | "image" => Ok(Self::Image),
            "vid" | "video" => Ok(Self::Video),
            "landing" => Ok(Self::Landing),
            other => Err(ParseError::InvalidSlot(other.to_string())),
        }
    }
}

/// 媒体资源来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetSource {
    /// 不透明的字符串引用（远程 URL 或本地路径）
    Reference(String),
    /// 原始二进制内容（拖入的本地文件）
    Content(Vec<u8>),
}

impl AssetSource {
    /// 创建引用
    pub fn reference(value: impl Into<String>) -> Self {
        Self::Reference(value.into())
    }

    /// 对应的类型标记
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Reference(_) => TAG_REFERENCE,
            Self::Content(_) => TAG_CONTENT,
        }
    }

    /// 拆分为（值，标记）两个存储值
    pub fn to_stored(&self) -> (StoredValue, StoredValue) {
        let value = match self {
            Self::Reference(s) => StoredValue::Text(s.clone()),
            Self::Content(bytes) => StoredValue::Bytes(bytes.clone()),
        };
        (value, StoredValue::Text(self.tag().to_string()))
    }

    /// 由（值，标记）还原
    ///
    /// 缺少标记时按值的形态推断（兼容只写了值的旧数据）。
    pub fn from_stored(value: StoredValue, tag: Option<&StoredValue>) -> Result<Self, AssetError> {
        let tag = match tag {
            None => {
                return Ok(match value {
                    StoredValue::Text(s) => Self::Reference(s),
                    StoredValue::Bytes(b) => Self::Content(b),
                });
            }
            Some(StoredValue::Text(tag)) => tag.as_str(),
            Some(StoredValue::Bytes(_)) => {
                return Err(AssetError::UnknownTag {
                    tag: "<binary>".to_string(),
                });
            }
        };

        match (tag, value) {
            (TAG_REFERENCE, StoredValue::Text(s)) => Ok(Self::Reference(s)),
            (TAG_CONTENT, StoredValue::Bytes(b)) => Ok(Self::Content(b)),
            (TAG_REFERENCE | TAG_CONTENT, other) => Err(AssetError::TagMismatch {
                tag: tag.to_string(),
                actual: other.shape(),
            }),
            (unknown, _) => Err(AssetError::UnknownTag {
                tag: unknown.to_string(),
            }),
        }
    }

    /// 内容大小（引用返回字符串长度）
    pub fn len(&self) -> usize {
        match self {
            Self::Reference(s) => s.len(),
            Self::Content(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 媒体类型，决定展示层用图片还是视频渲染
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// 按引用字符串推断
    ///
    /// `.mp4` 结尾或包含 `video` 的引用视为视频，其余视为图片。
    pub fn from_reference(reference: &str) -> Self {
        let lower = reference.to_ascii_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or(lower.as_str());
        if path.ends_with(".mp4") || path.ends_with(".webm") || lower.contains("video") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

/// 一次会话配置中的三项资源
///
/// `None` 表示该槽位尚未设置（或读档时不存在）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAssets {
    pub image: Option<AssetSource>,
    pub video: Option<AssetSource>,
    pub landing: Option<AssetSource>,
}

impl SessionAssets {
    /// 三个槽位都使用启动时的引用
    pub fn with_defaults() -> Self {
        let mut assets = Self::default();
        for slot in AssetSlot::ALL {
            assets.set(slot, AssetSource::reference(slot.default_reference()));
        }
        assets
    }

    pub fn get(&self, slot: AssetSlot) -> Option<&AssetSource> {
        match slot {
            AssetSlot::Image => self.image.as_ref(),
            AssetSlot::Video => self.video.as_ref(),
            AssetSlot::Landing => self.landing.as_ref(),
        }
    }

    pub fn set(&mut self, slot: AssetSlot, source: AssetSource) {
        let target = match slot {
            AssetSlot::Image => &mut self.image,
            AssetSlot::Video => &mut self.video,
            AssetSlot::Landing => &mut self.landing,
        };
        *target = Some(source);
    }

    /// 用 `other` 中已存在的槽位覆盖自身，缺失的槽位保持不变
    pub fn merge(&mut self, other: SessionAssets) {
        for (slot, source) in other.into_entries() {
            self.set(slot, source);
        }
    }

    /// 已设置的（槽位，资源）列表
    pub fn entries(&self) -> impl Iterator<Item = (AssetSlot, &AssetSource)> {
        AssetSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|s| (slot, s)))
    }

    fn into_entries(self) -> Vec<(AssetSlot, AssetSource)> {
        [
            (AssetSlot::Image, self.image),
            (AssetSlot::Video, self.video),
            (AssetSlot::Landing, self.landing),
        ]
        .into_iter()
        .filter_map(|(slot, source)| source.map(|s| (slot, s)))
        .collect()
    }

    /// 是否没有任何槽位
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}
