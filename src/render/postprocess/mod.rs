//! 后处理合成
//!
//! 主通道直接写入呈现目标，没有中间颜色附件。描边合成通道随后在同一目标上绘制一个
//! 全屏四边形：采样深度预通道纹理做边缘检测，输出描边颜色和覆盖度（alpha），
//! 并按 [`CompositeBlend`] 明确指定的规则叠加到主通道结果之上。
//!
//! # 示例
//!
//! ```ignore
//! backend.begin_render_pass(composite_pass_desc());
//! backend.draw_fullscreen(FULLSCREEN_VERTEX_COUNT, CompositeBlend::AlphaOver);
//! backend.end_render_pass();
//! ```

use crate::impl_default;

/// 全屏四边形顶点数（两个三角形）
pub const FULLSCREEN_VERTEX_COUNT: u32 = 6;

/// 合成混合规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeBlend {
    /// `src * src_alpha + dst * (1 - src_alpha)`：描边覆盖在主通道颜色之上
    #[default]
    AlphaOver,
}

impl CompositeBlend {
    /// 对应的 wgpu 混合状态
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            CompositeBlend::AlphaOver => Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }
}

/// 描边设置
#[derive(Debug, Clone)]
pub struct OutlineSettings {
    /// 描边颜色
    pub color: [f32; 4],
    /// 线性深度差超过该阈值时视为边缘
    pub depth_threshold: f32,
    /// 采样半径（像素）
    pub thickness: f32,
}

impl_default!(OutlineSettings {
    color: [0.02, 0.02, 0.05, 1.0],
    depth_threshold: 0.35,
    thickness: 1.0,
});

/// 描边 Uniform 数据
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OutlineUniforms {
    pub color: [f32; 4],
    pub depth_threshold: f32,
    pub thickness: f32,
    /// 用于线性化深度的近/远裁剪面
    pub near: f32,
    pub far: f32,
}

impl OutlineSettings {
    /// 生成 uniform 数据
    ///
    /// # 参数
    /// - `near`: 近裁剪面
    /// - `far`: 远裁剪面
    pub fn uniforms(&self, near: f32, far: f32) -> OutlineUniforms {
        OutlineUniforms {
            color: self.color,
            depth_threshold: self.depth_threshold,
            thickness: self.thickness.max(1.0),
            near,
            far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_over_is_default() {
        assert_eq!(CompositeBlend::default(), CompositeBlend::AlphaOver);
        assert_eq!(
            CompositeBlend::AlphaOver.blend_state(),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
    }

    #[test]
    fn test_outline_uniforms() {
        let uniforms = OutlineSettings::default().uniforms(0.1, 500.0);
        assert_eq!(std::mem::size_of::<OutlineUniforms>(), 32);
        assert_eq!(uniforms.near, 0.1);
        assert_eq!(uniforms.thickness, 1.0);
    }
}
