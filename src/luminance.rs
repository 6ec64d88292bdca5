// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/luminance.rs - 图像平均亮度
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::RgbaImage;

/// ITU-R BT.601 亮度权重。
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// RGBA 图像的平均亮度，范围 `[0, 255]`，alpha 不参与计算。
pub fn luminance(image: &RgbaImage) -> f32 {
  luminance_of_rgba(image.as_raw())
}

/// 按 RGBA 排列的原始字节计算平均亮度，空缓冲区返回 0。
pub fn luminance_of_rgba(rgba: &[u8]) -> f32 {
  let mut sum = 0.0f64;
  let mut count = 0usize;
  for px in rgba.chunks_exact(4) {
    sum += LUMA_WEIGHTS[0] * px[0] as f64
      + LUMA_WEIGHTS[1] * px[1] as f64
      + LUMA_WEIGHTS[2] * px[2] as f64;
    count += 1;
  }

  if count == 0 {
    return 0.0;
  }
  (sum / count as f64) as f32
}
