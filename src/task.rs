// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/task.rs - 任务定义
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

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{
  analyzer::{Analysis, Analyzer},
  input::SourceImage,
  output::Render,
};

pub trait Task<I, O>: Sized {
  type Error;
  type Output;
  fn run_task(self, input: I, analyzer: &Analyzer, output: O) -> Result<Self::Output, Self::Error>;
}

pub struct OneShotTask;

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = SourceImage>,
  O: Render<SourceImage, Analysis, Error = RE>,
> Task<I, O> for OneShotTask
{
  type Error = anyhow::Error;
  type Output = Analysis;

  fn run_task(self, mut input: I, analyzer: &Analyzer, output: O) -> Result<Analysis, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始分析...");
    let now = Instant::now();
    let result = analyzer.analyze(&frame)?;
    info!("分析完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}

/// 对同一张图像重复分析，统计平均耗时。
pub struct RepeatShotTask {
  pub repeat: usize,
  pub warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat: 100,
      warmup: 2,
    }
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = SourceImage>,
  O: Render<SourceImage, Analysis, Error = RE>,
> Task<I, O> for RepeatShotTask
{
  type Error = anyhow::Error;
  type Output = Option<Duration>;

  fn run_task(
    self,
    mut input: I,
    analyzer: &Analyzer,
    output: O,
  ) -> Result<Option<Duration>, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始分析...");
    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = analyzer.analyze(&frame)?;
      let elapsed = now.elapsed();
      info!("({})分析完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      times.push(elapsed);
    }

    let mean = mean_after_warmup(&times, self.warmup);
    match mean {
      Some(mean) => warn!(
        "平均分析耗时: {:.2?}（跳过前 {} 次，共 {} 次）",
        mean,
        self.warmup,
        times.len()
      ),
      None => warn!("运行次数不足 {} 次，无法统计平均耗时", self.warmup + 1),
    }

    Ok(mean)
  }
}

fn mean_after_warmup(times: &[Duration], warmup: usize) -> Option<Duration> {
  let measured = times.get(warmup..)?;
  if measured.is_empty() {
    return None;
  }
  let total: Duration = measured.iter().sum();
  Some(total / measured.len() as u32)
}
