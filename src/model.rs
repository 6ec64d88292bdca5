// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/model.rs - 肤色分类模型
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

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{FromUrl, frame::ModelTensor};

pub const MST_CLASS_NUM: usize = 10;

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理错误: {0}")]
  InferenceError(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

pub trait WithLabel: Sized + fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Option<Self>;
}

/// Monk 肤色量表的十个等级，MST1 最浅，MST10 最深。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MstLabel {
  #[serde(rename = "MST1")]
  Mst1 = 1,
  #[serde(rename = "MST2")]
  Mst2,
  #[serde(rename = "MST3")]
  Mst3,
  #[serde(rename = "MST4")]
  Mst4,
  #[serde(rename = "MST5")]
  Mst5,
  #[serde(rename = "MST6")]
  Mst6,
  #[serde(rename = "MST7")]
  Mst7,
  #[serde(rename = "MST8")]
  Mst8,
  #[serde(rename = "MST9")]
  Mst9,
  #[serde(rename = "MST10")]
  Mst10,
}

impl MstLabel {
  pub const ALL: [MstLabel; MST_CLASS_NUM] = [
    MstLabel::Mst1,
    MstLabel::Mst2,
    MstLabel::Mst3,
    MstLabel::Mst4,
    MstLabel::Mst5,
    MstLabel::Mst6,
    MstLabel::Mst7,
    MstLabel::Mst8,
    MstLabel::Mst9,
    MstLabel::Mst10,
  ];

  /// 无法解析预测时使用的默认等级。
  pub const FALLBACK: MstLabel = MstLabel::Mst5;

  pub fn from_number(n: u8) -> Option<Self> {
    Self::from_index(n.checked_sub(1)? as usize)
  }

  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  /// 等级数字，1..=10。
  pub fn number(self) -> u8 {
    self as u8
  }

  /// 在预测向量中的下标，0..=9。
  pub fn index(self) -> usize {
    self.number() as usize - 1
  }
}

impl fmt::Display for MstLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "MST{}", self.number())
  }
}

impl FromStr for MstLabel {
  type Err = ClassifierError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.strip_prefix("MST")
      .and_then(|n| n.parse::<u8>().ok())
      .and_then(MstLabel::from_number)
      .ok_or_else(|| ClassifierError::ModelInvalid(format!("未知标签: {}", s)))
  }
}

impl WithLabel for MstLabel {
  fn to_label_str(&self) -> String {
    self.to_string()
  }

  fn to_label_id(&self) -> u32 {
    self.index() as u32
  }

  fn from_label_id(id: u32) -> Option<Self> {
    Self::from_index(id as usize)
  }
}

/// 按 MST1..MST10 排列的原始得分。
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionVector {
  scores: Box<[f32]>,
}

impl From<Vec<f32>> for PredictionVector {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Top1 {
  pub label: MstLabel,
  /// argmax 处的原始得分，未经 softmax，截断到 `[0, 1]`。
  pub confidence: f32,
  /// 是否因向量不完整而使用了默认等级。
  pub fallback: bool,
}

impl PredictionVector {
  pub fn scores(&self) -> &[f32] {
    &self.scores
  }

  fn argmax(&self) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in self.scores.iter().enumerate() {
      if score.is_nan() {
        continue;
      }
      // 严格大于：同分时保留靠前的下标
      if best.is_none_or(|(_, b)| score > b) {
        best = Some((idx, score));
      }
    }
    best
  }

  /// 取得分最高的等级，读取后向量即被消耗。
  pub fn top1(self) -> Top1 {
    let best = self.argmax();
    let confidence = best.map(|(_, s)| s.clamp(0.0, 1.0)).unwrap_or(0.0);

    let label = if self.scores.len() < MST_CLASS_NUM {
      warn!(
        "预测向量长度不足: 期望 {}, 实际 {}，使用 {}",
        MST_CLASS_NUM,
        self.scores.len(),
        MstLabel::FALLBACK
      );
      None
    } else {
      best.and_then(|(idx, _)| MstLabel::from_index(idx))
    };

    match label {
      Some(label) => {
        debug!("预测结果: {} ({:.4})", label, confidence);
        Top1 {
          label,
          confidence,
          fallback: false,
        }
      }
      None => Top1 {
        label: MstLabel::FALLBACK,
        confidence,
        fallback: true,
      },
    }
  }
}

pub trait Classifier: Send + Sync {
  fn predict(&self, tensor: &ModelTensor) -> Result<PredictionVector, ClassifierError>;
}

#[cfg(feature = "model_rknn")]
mod rknn_classifier;
#[cfg(feature = "model_rknn")]
pub use self::rknn_classifier::{RknnClassifier, RknnClassifierBuilder};

/// 按 URL 方案选择的分类模型构建器。
pub enum ClassifierBuilderWrapper {
  #[cfg(feature = "model_rknn")]
  Rknn(RknnClassifierBuilder),
}

impl FromUrl for ClassifierBuilderWrapper {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "model_rknn")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == RknnClassifierBuilder::SCHEME {
        return Ok(ClassifierBuilderWrapper::Rknn(
          RknnClassifierBuilder::from_url(url)?,
        ));
      }
    }
    Err(ClassifierError::ModelPathError(format!(
      "不支持的模型方案: {}",
      url.scheme()
    )))
  }
}

impl ClassifierBuilderWrapper {
  pub fn build(&self) -> Result<Arc<dyn Classifier>, ClassifierError> {
    match *self {
      #[cfg(feature = "model_rknn")]
      ClassifierBuilderWrapper::Rknn(ref builder) => Ok(Arc::new(builder.build()?)),
    }
  }
}
