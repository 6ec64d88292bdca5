// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/model/rknn_classifier.rs - RKNN 肤色分类模型
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

use std::{path::PathBuf, sync::Mutex};

use rknpu::{Context, InitFlags, TensorType};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ModelTensor,
  model::{Classifier, ClassifierError, MST_CLASS_NUM, PredictionVector},
};

const RKNN_NUM_INPUTS: u32 = 1;
const RKNN_NUM_OUTPUTS: u32 = 1;

impl From<rknpu::Error> for ClassifierError {
  fn from(err: rknpu::Error) -> Self {
    ClassifierError::InferenceError(err.to_string())
  }
}

pub struct RknnClassifierBuilder {
  model_path: PathBuf,
  flags: InitFlags,
}

impl FromUrlWithScheme for RknnClassifierBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RknnClassifierBuilder {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(RknnClassifierBuilder {
      model_path: url
        .to_file_path()
        .map_err(|_| ClassifierError::ModelPathError(url.to_string()))?,
      flags: InitFlags::default(),
    })
  }
}

impl RknnClassifierBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build(&self) -> Result<RknnClassifier, ClassifierError> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)
      .map_err(|e| ClassifierError::ModelLoadError(e.to_string()))?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| ClassifierError::ModelInvalid(format!("无法获取输入数量: {}", e)))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| ClassifierError::ModelInvalid(format!("无法获取输出数量: {}", e)))?;

    if num_inputs != RKNN_NUM_INPUTS || num_outputs != RKNN_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        RKNN_NUM_INPUTS, RKNN_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(ClassifierError::ModelInvalid(msg));
    }
    info!("模型加载完成");

    Ok(RknnClassifier {
      context: Mutex::new(context),
    })
  }
}

/// 运行在 Rockchip NPU 上的分类模型。
///
/// 模型的均值/方差归一化在转换时已写入输入层，这里按 u8 NHWC 喂入。
pub struct RknnClassifier {
  context: Mutex<Context>,
}

impl Classifier for RknnClassifier {
  fn predict(&self, tensor: &ModelTensor) -> Result<PredictionVector, ClassifierError> {
    let context = self
      .context
      .lock()
      .map_err(|_| ClassifierError::InferenceError("推理上下文锁已损坏".to_string()))?;

    debug!("设置模型输入");
    context.set_input(
      0,
      &tensor.to_u8_nhwc(),
      rknpu::TensorFormat::NHWC,
      TensorType::UInt8,
    )?;

    debug!("执行模型推理");
    context.run()?;

    let output = context.get_outputs()?;
    let scores = output.get_f32(0)?.to_vec();
    if scores.len() != MST_CLASS_NUM {
      debug!("模型输出长度为 {}，期望 {}", scores.len(), MST_CLASS_NUM);
    }

    Ok(PredictionVector::from(scores))
  }
}
