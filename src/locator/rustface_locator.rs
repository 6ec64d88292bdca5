// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/locator/rustface_locator.rs - SeetaFace 人脸定位器
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

use std::path::PathBuf;

use image::RgbaImage;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  locator::{BoxShape, FaceCandidate, FaceLocator, LocatorError},
};

const DEFAULT_MIN_FACE_SIZE: u32 = 20;
const DEFAULT_SCORE_THRESH: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;

pub struct RustfaceLocatorBuilder {
  model_path: PathBuf,
  min_face_size: u32,
  score_thresh: f64,
}

impl FromUrlWithScheme for RustfaceLocatorBuilder {
  const SCHEME: &'static str = "rustface";
}

impl FromUrl for RustfaceLocatorBuilder {
  type Error = LocatorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LocatorError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = RustfaceLocatorBuilder {
      model_path: url
        .to_file_path()
        .map_err(|_| LocatorError::ModelLoadError(format!("模型路径无效: {}", url)))?,
      min_face_size: DEFAULT_MIN_FACE_SIZE,
      score_thresh: DEFAULT_SCORE_THRESH,
    };

    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "min_face" => {
          builder.min_face_size = v
            .parse()
            .map_err(|_| LocatorError::ModelLoadError(format!("min_face 参数无效: {}", v)))?
        }
        "score" => {
          builder.score_thresh = v
            .parse()
            .map_err(|_| LocatorError::ModelLoadError(format!("score 参数无效: {}", v)))?
        }
        _ => {}
      }
    }

    Ok(builder)
  }
}

impl RustfaceLocatorBuilder {
  pub fn min_face_size(mut self, size: u32) -> Self {
    self.min_face_size = size;
    self
  }

  pub fn score_thresh(mut self, thresh: f64) -> Self {
    self.score_thresh = thresh;
    self
  }

  pub fn build(&self) -> Result<RustfaceLocator, LocatorError> {
    info!("加载人脸模型文件: {}", self.model_path.display());
    let file = std::fs::File::open(&self.model_path)?;
    let model = rustface::read_model(std::io::BufReader::new(file))
      .map_err(|e| LocatorError::ModelLoadError(e.to_string()))?;
    info!("人脸模型加载完成");

    Ok(RustfaceLocator {
      model,
      min_face_size: self.min_face_size,
      score_thresh: self.score_thresh,
    })
  }
}

pub struct RustfaceLocator {
  model: rustface::Model,
  min_face_size: u32,
  score_thresh: f64,
}

impl FaceLocator for RustfaceLocator {
  fn detect(&self, image: &RgbaImage) -> Result<Vec<FaceCandidate>, LocatorError> {
    let gray = image::imageops::grayscale(image);
    let (width, height) = gray.dimensions();

    let mut detector = rustface::create_detector_with_model(self.model.clone());
    detector.set_min_face_size(self.min_face_size);
    detector.set_score_thresh(self.score_thresh);
    detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
    detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

    let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
    debug!("SeetaFace 检测到 {} 张人脸", faces.len());

    Ok(
      faces
        .iter()
        .map(|face| {
          let bbox = face.bbox();
          FaceCandidate {
            bbox: BoxShape::Extent {
              x_min: bbox.x() as f32,
              y_min: bbox.y() as f32,
              width: bbox.width() as f32,
              height: bbox.height() as f32,
            },
            score: face.score() as f32,
          }
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_overrides_defaults() {
    let url = Url::parse("rustface:///models/seeta.bin?min_face=40&score=1.5").unwrap();
    let builder = RustfaceLocatorBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, PathBuf::from("/models/seeta.bin"));
    assert_eq!(builder.min_face_size, 40);
    assert_eq!(builder.score_thresh, 1.5);
  }

  #[test]
  fn invalid_query_value_is_rejected() {
    let url = Url::parse("rustface:///models/seeta.bin?min_face=big").unwrap();
    assert!(RustfaceLocatorBuilder::from_url(&url).is_err());
  }

  #[test]
  fn missing_model_file_fails_to_build() {
    let url = Url::parse("rustface:///nonexistent/seeta.bin").unwrap();
    let builder = RustfaceLocatorBuilder::from_url(&url).unwrap();
    assert!(matches!(builder.build(), Err(LocatorError::IoError(_))));
  }
}
