//! # Media 模块
//!
//! 判断资源应当以图片还是视频渲染。

use scene_runtime::{AssetSource, MediaKind};

/// 判断资源的媒体类型
///
/// - 引用：按扩展名 / `video` 标记推断
/// - 原始内容：能识别为图片格式的视为图片，否则视为视频
pub fn detect(source: &AssetSource) -> MediaKind {
    match source {
        AssetSource::Reference(reference) => MediaKind::from_reference(reference),
        AssetSource::Content(bytes) => match image::guess_format(bytes) {
            Ok(_) => MediaKind::Image,
            Err(_) => MediaKind::Video,
        },
    }
}
