use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

/// 深度目标格式
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// 离屏深度目标
///
/// `sampled` 为真时额外带 `TEXTURE_BINDING`，可在后续通道中作为深度纹理读取。
pub struct DepthTarget {
    /// 纹理
    pub texture: Texture,
    /// 纹理视图
    pub view: TextureView,
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
    label: &'static str,
    sampled: bool,
}

impl DepthTarget {
    /// 创建深度目标
    pub fn new(device: &Device, label: &'static str, width: u32, height: u32, sampled: bool) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let (texture, view) = create_depth_texture(device, label, width, height, sampled);
        Self {
            texture,
            view,
            width,
            height,
            label,
            sampled,
        }
    }

    /// 调整大小
    ///
    /// # 返回
    /// 纹理被重建时返回 true（引用旧视图的绑定组需要重建）
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> bool {
        if !needs_resize((self.width, self.height), (width, height)) {
            return false;
        }

        self.width = width;
        self.height = height;
        let (texture, view) = create_depth_texture(device, self.label, width, height, self.sampled);
        self.texture = texture;
        self.view = view;
        true
    }
}

/// 尺寸是否需要变化；零尺寸（窗口最小化）不触发重建
pub fn needs_resize(current: (u32, u32), requested: (u32, u32)) -> bool {
    requested.0 > 0 && requested.1 > 0 && current != requested
}

fn create_depth_texture(
    device: &Device,
    label: &str,
    width: u32,
    height: u32,
    sampled: bool,
) -> (Texture, TextureView) {
    let mut usage = TextureUsages::RENDER_ATTACHMENT;
    if sampled {
        usage |= TextureUsages::TEXTURE_BINDING;
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_resize() {
        assert!(needs_resize((800, 600), (1920, 1080)));
        assert!(!needs_resize((800, 600), (800, 600)));
        assert!(!needs_resize((800, 600), (0, 0)));
        assert!(!needs_resize((800, 600), (1024, 0)));
    }
}
