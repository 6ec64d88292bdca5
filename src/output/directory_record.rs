// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::Utc;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, analyzer::Analysis, input::SourceImage, output::Render};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("目录路径无效: {0}")]
  InvalidPath(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存处理后图像与 JSON 记录。
///
/// `folder:///dir?original` 时同时保存原图。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  original: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      directory: uri
        .to_file_path()
        .map_err(|_| DirectoryRecordOutputError::InvalidPath(uri.to_string()))?,
      original: uri.query_pairs().any(|(k, _)| k == "original"),
    })
  }
}

impl DirectoryRecordOutput {
  fn record_stem(&self, request_id: &str) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self.directory.join(now.format("%Y/%m/%d").to_string());
    std::fs::create_dir_all(&directory)?;
    Ok(directory.join(format!("{}-{}", now.format("%H-%M-%S"), request_id)))
  }
}

impl Render<SourceImage, Analysis> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &SourceImage, result: &Analysis) -> Result<(), Self::Error> {
    let stem = self.record_stem(&result.request_id)?;

    result.processed.save(stem.with_extension("png"))?;
    std::fs::write(
      stem.with_extension("json"),
      serde_json::to_vec_pretty(&result.record)?,
    )?;
    if self.original {
      let path = PathBuf::from(format!("{}-original.{}", stem.display(), frame.extension()));
      std::fs::write(path, frame.bytes())?;
    }

    info!("保存分析记录: {}", stem.display());
    Ok(())
  }
}
