// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/preprocess.rs - 图像预处理：解码、裁剪、缩放
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

use image::{DynamicImage, RgbaImage, imageops::FilterType};
use tracing::{debug, info};

use crate::{
  crop::{CropRegion, FaceBox},
  error::{AnalyzeError, StageOutcome},
  frame::{MODEL_INPUT_SIZE, ModelTensor},
  input::SourceImage,
  locator::{FaceLocator, locate},
  luminance::luminance,
  runtime::ComputeRuntime,
};

/// 预处理产物，张量交给推理，其余用于展示与修正。
#[derive(Debug)]
pub struct Preprocessed {
  pub tensor: ModelTensor,
  pub processed: RgbaImage,
  pub luminance: f32,
  pub detection: StageOutcome<FaceBox>,
  pub crop: CropRegion,
  pub source_size: (u32, u32),
}

pub fn decode(source: &SourceImage) -> Result<DynamicImage, AnalyzeError> {
  let image = image::load_from_memory(source.bytes())?;
  if image.width() == 0 || image.height() == 0 {
    return Err(AnalyzeError::DecodeFailure("图像尺寸为零".to_string()));
  }
  Ok(image)
}

pub fn preprocess(
  source: &SourceImage,
  locator: Option<&dyn FaceLocator>,
  runtime: &ComputeRuntime,
  padding: f32,
) -> Result<Preprocessed, AnalyzeError> {
  let rgba = decode(source)?.to_rgba8();
  let (width, height) = rgba.dimensions();
  debug!("解码完成: {}x{} ({})", width, height, source.mime());

  let detection = locate(locator, &rgba);
  let crop = CropRegion::from_face(detection.as_ok(), width, height, padding);
  info!(
    "裁剪区域: ({}, {}) {}x{}，人脸: {}",
    crop.x,
    crop.y,
    crop.width,
    crop.height,
    detection.is_ok()
  );

  let cropped = image::imageops::crop_imm(&rgba, crop.x, crop.y, crop.width, crop.height).to_image();
  let processed = image::imageops::resize(
    &cropped,
    MODEL_INPUT_SIZE,
    MODEL_INPUT_SIZE,
    FilterType::Triangle,
  );

  // 亮度在缩放后的图上计算，修正规则按此标定
  let luminance = luminance(&processed);
  debug!("平均亮度: {:.2}", luminance);

  let tensor = ModelTensor::from_image(&processed, runtime.lease())
    .map_err(|e| AnalyzeError::DecodeFailure(e.to_string()))?;

  Ok(Preprocessed {
    tensor,
    processed,
    luminance,
    detection,
    crop,
    source_size: (width, height),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::locator::{BoxShape, FaceCandidate, LocatorError};
  use image::{ImageFormat, Rgba};
  use std::io::Cursor;

  fn png(image: &RgbaImage) -> SourceImage {
    let mut buffer = Vec::new();
    image
      .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
      .unwrap();
    SourceImage::new(buffer, "image/png").unwrap()
  }

  struct OneFace(BoxShape);

  impl FaceLocator for OneFace {
    fn detect(&self, _image: &RgbaImage) -> Result<Vec<FaceCandidate>, LocatorError> {
      Ok(vec![FaceCandidate {
        bbox: self.0,
        score: 0.95,
      }])
    }
  }

  #[test]
  fn undecodable_bytes_fail() {
    let runtime = ComputeRuntime::default();
    let source = SourceImage::new(b"not an image".to_vec(), "image/png").unwrap();
    let err = preprocess(&source, None, &runtime, 0.2).unwrap_err();
    assert!(matches!(err, AnalyzeError::DecodeFailure(_)));
    assert_eq!(runtime.live_tensors(), 0);
  }

  #[test]
  fn without_locator_full_frame_is_resized() {
    let runtime = ComputeRuntime::default();
    let source = png(&RgbaImage::from_pixel(300, 200, Rgba([128, 128, 128, 255])));
    let out = preprocess(&source, None, &runtime, 0.2).unwrap();

    assert!(out.detection.is_degraded());
    assert!(out.crop.is_full_frame(300, 200));
    assert_eq!(out.source_size, (300, 200));
    assert_eq!(out.processed.dimensions(), (224, 224));
    assert_eq!(out.tensor.shape(), [1, 224, 224, 3]);
    assert!((out.luminance - 128.0).abs() < 1.0);
    assert_eq!(runtime.live_tensors(), 1);
    drop(out);
    assert_eq!(runtime.live_tensors(), 0);
  }

  #[test]
  fn luminance_is_measured_on_the_face_crop() {
    // 暗色背景中央一块亮色“人脸”
    let mut image = RgbaImage::from_pixel(400, 400, Rgba([10, 10, 10, 255]));
    for y in 150..250 {
      for x in 150..250 {
        image.put_pixel(x, y, Rgba([220, 220, 220, 255]));
      }
    }
    let locator = OneFace(BoxShape::Corners {
      x_min: 160.0,
      y_min: 160.0,
      x_max: 240.0,
      y_max: 240.0,
    });

    let runtime = ComputeRuntime::default();
    let out = preprocess(&png(&image), Some(&locator), &runtime, 0.2).unwrap();

    assert!(out.detection.is_ok());
    assert_eq!(
      out.crop,
      CropRegion {
        x: 144,
        y: 144,
        width: 112,
        height: 112
      }
    );
    // 整幅图的平均亮度约 22，裁剪后远高于弱光阈值
    assert!(out.luminance > 150.0, "{}", out.luminance);
  }
}
