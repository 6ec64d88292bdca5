// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复分析基准测试
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use tonescope::{
  Analyzer, FromUrl,
  input::ImageFileInput,
  locator::LocatorBuilderWrapper,
  model::ClassifierBuilderWrapper,
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Tonescope 基准测试参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型路径
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 人脸检测模型
  #[arg(long, value_name = "LOCATOR")]
  pub locator: Option<Url>,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:?compact")]
  pub output: Url,
  /// 重复次数
  #[arg(long, default_value_t = 100)]
  pub repeat: usize,
  /// 预热次数，不计入平均耗时
  #[arg(long, default_value_t = 2)]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let classifier = ClassifierBuilderWrapper::from_url(&args.model)?.build()?;

  let mut builder = Analyzer::builder().classifier_loader(move || Ok::<_, String>(classifier.clone()));
  if let Some(url) = &args.locator {
    let locator = LocatorBuilderWrapper::from_url(url)?.build()?;
    builder = builder.locator_loader(move || Ok::<_, String>(locator.clone()));
  }
  let analyzer = builder.build()?;

  RepeatShotTask {
    repeat: args.repeat,
    warmup: args.warmup,
  }
  .run_task(input, &analyzer, output)?;

  Ok(())
}
