//! 核心宏定义
//!
//! 配置结构体大量使用字段级默认值，用宏收敛重复的 `Default` 实现。

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use sph_toon::impl_default;
///
/// struct TickRate {
///     ticks_per_second: u32,
///     max_frameskip: u32,
/// }
///
/// impl_default!(TickRate {
///     ticks_per_second: 25,
///     max_frameskip: 5,
/// });
///
/// assert_eq!(TickRate::default().max_frameskip, 5);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
