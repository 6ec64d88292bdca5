// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/error.rs - 错误与降级结果定义
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

use thiserror::Error;

use crate::{input::InputError, model::ClassifierError, runtime::RuntimeError};

/// 会中断一次分析请求的错误。
///
/// 人脸定位失败与上传失败不在此列，它们以 [`StageOutcome::Degraded`]
/// 记录在结果里。
#[derive(Error, Debug)]
pub enum AnalyzeError {
  #[error("输入无效: {0}")]
  InvalidInput(#[from] InputError),
  #[error("图像解码失败: {0}")]
  DecodeFailure(String),
  #[error("计算后端不可用: {0}")]
  BackendUnavailable(String),
}

impl From<image::ImageError> for AnalyzeError {
  fn from(err: image::ImageError) -> Self {
    AnalyzeError::DecodeFailure(err.to_string())
  }
}

impl From<RuntimeError> for AnalyzeError {
  fn from(err: RuntimeError) -> Self {
    AnalyzeError::BackendUnavailable(err.to_string())
  }
}

impl From<ClassifierError> for AnalyzeError {
  fn from(err: ClassifierError) -> Self {
    AnalyzeError::BackendUnavailable(err.to_string())
  }
}

/// 可降级阶段的结果：成功，或带原因的降级。
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
  Ok(T),
  Degraded(String),
}

impl<T> StageOutcome<T> {
  pub fn degraded(reason: impl Into<String>) -> Self {
    StageOutcome::Degraded(reason.into())
  }

  pub fn is_ok(&self) -> bool {
    matches!(self, StageOutcome::Ok(_))
  }

  pub fn is_degraded(&self) -> bool {
    matches!(self, StageOutcome::Degraded(_))
  }

  pub fn as_ok(&self) -> Option<&T> {
    match self {
      StageOutcome::Ok(value) => Some(value),
      StageOutcome::Degraded(_) => None,
    }
  }

  pub fn reason(&self) -> Option<&str> {
    match self {
      StageOutcome::Ok(_) => None,
      StageOutcome::Degraded(reason) => Some(reason),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::InputError;

  #[test]
  fn messages_are_single_line() {
    let errors = [
      AnalyzeError::from(InputError::UnsupportedMime("text/plain".into())),
      AnalyzeError::DecodeFailure("bad header".into()),
      AnalyzeError::BackendUnavailable("no device".into()),
    ];
    for err in errors {
      let message = err.to_string();
      assert!(!message.is_empty());
      assert!(!message.contains('\n'));
    }
  }

  #[test]
  fn stage_outcome_accessors() {
    let ok: StageOutcome<u32> = StageOutcome::Ok(3);
    assert!(ok.is_ok());
    assert_eq!(ok.as_ok(), Some(&3));
    assert_eq!(ok.reason(), None);

    let degraded: StageOutcome<u32> = StageOutcome::degraded("未检测到人脸");
    assert!(degraded.is_degraded());
    assert_eq!(degraded.as_ok(), None);
    assert_eq!(degraded.reason(), Some("未检测到人脸"));
  }
}
