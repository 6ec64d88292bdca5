// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/lib.rs - 库主文件
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

//! 肤色镜：基于 Monk 肤色量表（MST）的人像肤色分级与穿搭配色推荐。
//!
//! 主流程见 [`analyzer::Analyzer`]：解码 → 人脸定位 → 裁剪缩放 → 推理 →
//! 亮度修正 → 查表生成推荐。人脸定位、分类模型与对象存储均以 trait 注入。

pub mod adjust;
pub mod analyzer;
pub mod compose;
pub mod crop;
pub mod error;
pub mod frame;
pub mod input;
pub mod locator;
pub mod luminance;
pub mod model;
pub mod output;
pub mod preprocess;
pub mod runtime;
pub mod storage;
pub mod task;

pub use analyzer::{Analysis, Analyzer, AnalyzerBuilder, AnalyzerConfig};
pub use error::{AnalyzeError, StageOutcome};

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}
