// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/adjust.rs - 弱光修正规则
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

use tracing::debug;

use crate::model::MstLabel;

/// 低于该亮度时，中段（MST4–MST7）预测加深两级。
pub const DIM_LUMINANCE: f32 = 80.0;
/// 低于该亮度时，MST8 以下的预测再加深三级。
pub const DARK_LUMINANCE: f32 = 50.0;

const DIM_SHIFT: u8 = 2;
const DARK_SHIFT: u8 = 3;

/// 补偿分类器在弱光下偏浅的倾向。
///
/// 两条规则依次生效，第二条作用于第一条的结果：
/// MST5 在亮度 40 下先变 MST7，再因 7 < 8 变为 MST10。
pub fn adjust(raw: MstLabel, luminance: f32) -> MstLabel {
  let mut n = raw.number();

  if luminance < DIM_LUMINANCE && (4..=7).contains(&n) {
    n = (n + DIM_SHIFT).min(10);
  }
  if luminance < DARK_LUMINANCE && n < 8 {
    n = (n + DARK_SHIFT).min(10);
  }

  let adjusted = MstLabel::from_number(n).unwrap_or(raw);
  if adjusted != raw {
    debug!("亮度 {:.1} 下修正预测: {} -> {}", luminance, raw, adjusted);
  }
  adjusted
}
