//! 图像资源加载

use std::path::Path;

use crate::core::error::{AssetError, AssetResult};

/// 解码后的 RGBA8 图像
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// 源图像是否带 alpha 通道
    pub has_alpha: bool,
    /// 按行排列的 RGBA8 像素
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// 每行字节数
    pub fn bytes_per_row(&self) -> u32 {
        4 * self.width
    }
}

/// 从文件加载图像
///
/// # 参数
/// - `path`: 图像路径（png / jpeg / tga）
///
/// # 返回
/// 文件不存在返回 `AssetError::NotFound`，无法解码返回 `AssetError::Decode`
pub fn load_image(path: impl AsRef<Path>) -> AssetResult<ImageData> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|_| AssetError::NotFound {
        path: path.display().to_string(),
    })?;
    let image = decode_image(&bytes, &path.display().to_string())?;
    tracing::info!(
        target: "assets",
        "Loaded image {} ({}x{}, alpha: {})",
        path.display(),
        image.width,
        image.height,
        image.has_alpha
    );
    Ok(image)
}

/// 从内存解码图像
pub fn decode_image(bytes: &[u8], label: &str) -> AssetResult<ImageData> {
    let image = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
        path: label.to_string(),
        reason: e.to_string(),
    })?;
    let has_alpha = image.color().has_alpha();
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(ImageData {
        width,
        height,
        has_alpha,
        pixels: rgba.into_raw(),
    })
}

/// 程序生成的圆形粒子精灵：中心不透明，向边缘平滑衰减
pub fn radial_sprite(size: u32) -> ImageData {
    let size = size.max(2);
    let center = (size as f32 - 1.0) * 0.5;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32 - center) / center;
            let dy = (y as f32 - center) / center;
            let r = (dx * dx + dy * dy).sqrt();
            let alpha = (1.0 - smoothstep(0.8, 1.0, r)).clamp(0.0, 1.0);
            // 轻微的中心高光
            let shade = 1.0 - 0.25 * r.min(1.0);
            let v = (shade * 255.0) as u8;
            pixels.extend_from_slice(&[v, v, v, (alpha * 255.0) as u8]);
        }
    }

    ImageData {
        width: size,
        height: size,
        has_alpha: true,
        pixels,
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
