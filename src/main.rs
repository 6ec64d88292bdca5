// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/main.rs - 项目主程序
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
use tracing::info;
use url::Url;

use tonescope::{
  Analyzer, AnalyzerConfig, FromUrl,
  input::ImageFileInput,
  locator::LocatorBuilderWrapper,
  model::ClassifierBuilderWrapper,
  output::OutputWrapper,
  storage::StoreWrapper,
  task::{OneShotTask, Task},
};

/// Tonescope 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型，例如 rknn:///path/model.rknn
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，例如 image:///path/face.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 人脸检测模型，例如 rustface:///path/seeta.bin
  #[arg(long, value_name = "LOCATOR")]
  pub locator: Option<Url>,
  /// 对象存储，例如 folder:///var/lib/tonescope
  #[arg(long, value_name = "STORE")]
  pub store: Option<Url>,
  /// 输出位置
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
  /// 人脸框扩展比例
  #[arg(long, default_value_t = AnalyzerConfig::default().crop_padding)]
  pub padding: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("模型路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let classifier = ClassifierBuilderWrapper::from_url(&args.model)?;
  let mut builder = Analyzer::builder()
    .crop_padding(args.padding)
    .classifier_loader(move || classifier.build());

  if let Some(url) = &args.locator {
    info!("人脸模型: {}", url);
    let locator = LocatorBuilderWrapper::from_url(url)?;
    builder = builder.locator_loader(move || locator.build());
  }
  if let Some(url) = &args.store {
    info!("对象存储: {}", url);
    builder = builder.shared_store(StoreWrapper::from_url(url)?.into_store());
  }

  let analyzer = builder.build()?;
  OneShotTask.run_task(input, &analyzer, output)?;

  Ok(())
}
