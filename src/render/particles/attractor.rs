use glam::Vec3;

/// 吸引点
///
/// 激活时位于相机前方固定距离处，向所有计算 pass 提供一个点力源；未激活时强度为 0。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attractor {
    position: Vec3,
    distance: f32,
    strength: f32,
    active: bool,
}

impl Default for Attractor {
    fn default() -> Self {
        Self::new(10.0, 40.0)
    }
}

impl Attractor {
    pub fn new(distance: f32, strength: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            distance,
            strength,
            active: false,
        }
    }

    /// 更新吸引点
    ///
    /// # 参数
    /// - `active`: 触发按钮是否按下
    /// - `eye`: 相机位置
    /// - `forward`: 相机朝向（单位向量）
    pub fn update(&mut self, active: bool, eye: Vec3, forward: Vec3) {
        if active != self.active {
            tracing::trace!(target: "simulation", "Attractor active: {}", active);
        }
        self.active = active;
        if active {
            self.position = eye + forward.normalize_or_zero() * self.distance;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// 写入计算 uniform 的 (位置, 强度)
    pub fn uniform(&self) -> ([f32; 4], f32) {
        let strength = if self.active { self.strength } else { 0.0 };
        (self.position.extend(1.0).to_array(), strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_attractor_has_no_strength() {
        let attractor = Attractor::new(5.0, 20.0);
        assert_eq!(attractor.uniform().1, 0.0);
    }

    #[test]
    fn test_follows_camera_forward() {
        let mut attractor = Attractor::new(5.0, 20.0);
        attractor.update(true, Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, -2.0));
        assert!(attractor.is_active());
        assert!((attractor.position() - Vec3::new(1.0, 2.0, -2.0)).length() < 1e-5);
        assert_eq!(attractor.uniform(), ([1.0, 2.0, -2.0, 1.0], 20.0));

        // 释放后保留最后位置，但强度归零
        attractor.update(false, Vec3::ZERO, Vec3::X);
        assert_eq!(attractor.uniform().1, 0.0);
        assert!((attractor.position() - Vec3::new(1.0, 2.0, -2.0)).length() < 1e-5);
    }
}
