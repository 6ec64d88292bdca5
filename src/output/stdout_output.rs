// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/output/stdout_output.rs - JSON 标准输出
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

use std::io::Write;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, analyzer::Analysis, compose::OutputRecord, input::SourceImage,
  output::Render,
};

#[derive(Error, Debug)]
pub enum StdoutOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把输出记录以 JSON 写到标准输出，`stdout:?compact` 输出单行。
pub struct StdoutOutput {
  compact: bool,
}

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = StdoutOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(StdoutOutputError::SchemeMismatch);
    }
    Ok(StdoutOutput {
      compact: url.query_pairs().any(|(k, _)| k == "compact"),
    })
  }
}

impl StdoutOutput {
  pub fn format_record(&self, record: &OutputRecord) -> Result<String, serde_json::Error> {
    if self.compact {
      serde_json::to_string(record)
    } else {
      serde_json::to_string_pretty(record)
    }
  }
}

impl Render<SourceImage, Analysis> for StdoutOutput {
  type Error = StdoutOutputError;

  fn render_result(&self, _frame: &SourceImage, result: &Analysis) -> Result<(), Self::Error> {
    let text = self.format_record(&result.record)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
  }
}
