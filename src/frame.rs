// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/frame.rs - NHWC 归一化张量定义
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
use thiserror::Error;

use crate::runtime::TensorLease;

pub const RGB_CHANNELS: usize = 3;
pub const MODEL_INPUT_SIZE: u32 = 224;

/// 分类模型的输入张量。
pub type ModelTensor = NormalizedTensor<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE>;

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
  #[error("图像尺寸不匹配: 期望 {expected_w}x{expected_h}, 实际 {actual_w}x{actual_h}")]
  ShapeMismatch {
    expected_w: u32,
    expected_h: u32,
    actual_w: u32,
    actual_h: u32,
  },
}

/// 形状为 `[1, H, W, 3]`、取值 `[0, 1]` 的 f32 张量。
///
/// 持有后端租约，张量被丢弃时租约随之释放。
#[derive(Debug)]
pub struct NormalizedTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
  _lease: TensorLease,
}

impl<const W: u32, const H: u32> NormalizedTensor<W, H> {
  pub fn from_image(image: &RgbaImage, lease: TensorLease) -> Result<Self, FrameError> {
    let (width, height) = image.dimensions();
    if width != W || height != H {
      return Err(FrameError::ShapeMismatch {
        expected_w: W,
        expected_h: H,
        actual_w: width,
        actual_h: height,
      });
    }

    // RGBA 丢弃 alpha，按 NHWC 排列
    let mut data = Vec::with_capacity(W as usize * H as usize * RGB_CHANNELS);
    for pixel in image.pixels() {
      for c in 0..RGB_CHANNELS {
        data.push(pixel[c] as f32 / 255.0);
      }
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      _lease: lease,
    })
  }

  pub fn shape(&self) -> [usize; 4] {
    [1, H as usize, W as usize, RGB_CHANNELS]
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  /// 量化回 u8，供输入层自带归一化的模型使用。
  pub fn to_u8_nhwc(&self) -> Vec<u8> {
    self
      .data
      .iter()
      .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
      .collect()
  }
}
