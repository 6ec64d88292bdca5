// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/locator.rs - 人脸定位接口
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

use std::panic::{AssertUnwindSafe, catch_unwind};

use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{FromUrl, crop::FaceBox, error::StageOutcome};

#[cfg(feature = "locator_rustface")]
mod rustface_locator;
#[cfg(feature = "locator_rustface")]
pub use self::rustface_locator::{RustfaceLocator, RustfaceLocatorBuilder};

#[derive(Error, Debug)]
pub enum LocatorError {
  #[error("人脸模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("人脸检测错误: {0}")]
  DetectError(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 检测器给出的框，两种常见表示都接受。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxShape {
  Extent {
    x_min: f32,
    y_min: f32,
    width: f32,
    height: f32,
  },
  Corners {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
  },
}

impl BoxShape {
  pub fn to_face_box(&self, confidence: f32) -> FaceBox {
    match *self {
      BoxShape::Extent {
        x_min,
        y_min,
        width,
        height,
      } => FaceBox {
        x: x_min,
        y: y_min,
        width,
        height,
        confidence,
      },
      BoxShape::Corners {
        x_min,
        y_min,
        x_max,
        y_max,
      } => FaceBox {
        x: x_min,
        y: y_min,
        width: x_max - x_min,
        height: y_max - y_min,
        confidence,
      },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCandidate {
  pub bbox: BoxShape,
  pub score: f32,
}

pub trait FaceLocator: Send + Sync {
  fn detect(&self, image: &RgbaImage) -> Result<Vec<FaceCandidate>, LocatorError>;
}

/// 取得分最高的候选，同分取第一个；得分非有限值的候选被忽略。
pub fn best_candidate(candidates: &[FaceCandidate]) -> Option<FaceBox> {
  let mut best: Option<&FaceCandidate> = None;
  for candidate in candidates.iter().filter(|c| c.score.is_finite()) {
    if best.is_none_or(|b| candidate.score > b.score) {
      best = Some(candidate);
    }
  }
  best.map(|c| c.bbox.to_face_box(c.score))
}

/// 运行人脸定位，任何失败都降级为“未检测到人脸”。
pub fn locate(locator: Option<&dyn FaceLocator>, image: &RgbaImage) -> StageOutcome<FaceBox> {
  let Some(locator) = locator else {
    debug!("未配置人脸定位器，使用整幅图像");
    return StageOutcome::degraded("未配置人脸定位器");
  };

  // 原生检测后端可能 panic，同样按检测失败处理
  let detected = catch_unwind(AssertUnwindSafe(|| locator.detect(image)));
  let Ok(detected) = detected else {
    warn!("人脸定位异常退出，使用整幅图像");
    return StageOutcome::degraded("人脸定位异常退出");
  };

  match detected {
    Ok(candidates) => {
      debug!("人脸候选数量: {}", candidates.len());
      match best_candidate(&candidates) {
        Some(face) => StageOutcome::Ok(face),
        None => {
          debug!("未检测到人脸，使用整幅图像");
          StageOutcome::degraded("未检测到人脸")
        }
      }
    }
    Err(e) => {
      warn!("人脸定位失败，使用整幅图像: {}", e);
      StageOutcome::degraded(e.to_string())
    }
  }
}

/// 按 URL 方案选择的人脸定位器构建器。
pub enum LocatorBuilderWrapper {
  #[cfg(feature = "locator_rustface")]
  Rustface(RustfaceLocatorBuilder),
}

impl FromUrl for LocatorBuilderWrapper {
  type Error = LocatorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "locator_rustface")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == RustfaceLocatorBuilder::SCHEME {
        return Ok(LocatorBuilderWrapper::Rustface(
          RustfaceLocatorBuilder::from_url(url)?,
        ));
      }
    }
    Err(LocatorError::SchemeMismatch(format!(
      "不支持的人脸定位器: {}",
      url.scheme()
    )))
  }
}

impl LocatorBuilderWrapper {
  pub fn build(&self) -> Result<std::sync::Arc<dyn FaceLocator>, LocatorError> {
    match *self {
      #[cfg(feature = "locator_rustface")]
      LocatorBuilderWrapper::Rustface(ref builder) => Ok(std::sync::Arc::new(builder.build()?)),
    }
  }
}
