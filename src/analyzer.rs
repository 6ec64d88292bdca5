// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/analyzer.rs - 分析流程编排
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

use std::{
  fmt::Display,
  io::Cursor,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Instant,
};

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use tracing::{debug, info, warn};

use crate::{
  compose::{ClassificationResult, OutputRecord},
  crop::{CropRegion, FACE_PADDING_RATIO, FaceBox},
  error::{AnalyzeError, StageOutcome},
  input::{MAX_SOURCE_BYTES, SourceImage},
  locator::FaceLocator,
  model::Classifier,
  preprocess::{Preprocessed, preprocess},
  runtime::{ComputeRuntime, InitCell, RuntimeError},
  storage::{Artifact, ObjectStore, memory_url, upload_or_fallback},
};

const PNG_MIME: &str = "image/png";

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
  /// 人脸框四周的扩展比例。
  pub crop_padding: f32,
  /// 接受的最大文件字节数。
  pub max_source_bytes: usize,
}

impl Default for AnalyzerConfig {
  fn default() -> Self {
    Self {
      crop_padding: FACE_PADDING_RATIO,
      max_source_bytes: MAX_SOURCE_BYTES,
    }
  }
}

type Loader<T> = Box<dyn Fn() -> Result<Arc<T>, String> + Send + Sync>;

/// 首次使用时加载、之后复用的模型句柄。
struct LazyModel<T: ?Sized> {
  kind: &'static str,
  cell: InitCell<T>,
  loader: Loader<T>,
}

impl<T: ?Sized> LazyModel<T> {
  fn new<F, E>(kind: &'static str, load: F) -> Self
  where
    F: Fn() -> Result<Arc<T>, E> + Send + Sync + 'static,
    E: Display,
  {
    Self {
      kind,
      cell: InitCell::new(),
      loader: Box::new(move || load().map_err(|e| e.to_string())),
    }
  }

  fn ready(kind: &'static str, value: Arc<T>) -> Self
  where
    T: Send + Sync + 'static,
  {
    Self::new(kind, move || Ok::<_, String>(value.clone()))
  }

  fn get(&self) -> Result<Arc<T>, RuntimeError> {
    self.cell.get_or_try_init(|| {
      info!("加载{}", self.kind);
      let now = Instant::now();
      let loaded = (self.loader)();
      debug!("加载{}耗时: {:.2?}", self.kind, now.elapsed());
      loaded
    })
  }

  fn reset(&self) {
    self.cell.reset();
  }
}

/// 一次分析的全部产物。
#[derive(Debug, Clone)]
pub struct Analysis {
  pub request_id: String,
  pub result: ClassificationResult,
  pub record: OutputRecord,
  pub detection: StageOutcome<FaceBox>,
  pub crop: CropRegion,
  pub source_size: (u32, u32),
  pub processed: RgbaImage,
  pub original: Artifact,
  pub processed_artifact: Artifact,
}

pub struct AnalyzerBuilder {
  config: AnalyzerConfig,
  runtime: Option<Arc<ComputeRuntime>>,
  classifier: Option<LazyModel<dyn Classifier>>,
  locator: Option<LazyModel<dyn FaceLocator>>,
  store: Option<Arc<dyn ObjectStore>>,
}

impl AnalyzerBuilder {
  pub fn config(mut self, config: AnalyzerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn crop_padding(mut self, padding: f32) -> Self {
    self.config.crop_padding = padding;
    self
  }

  pub fn max_source_bytes(mut self, limit: usize) -> Self {
    self.config.max_source_bytes = limit;
    self
  }

  /// 共享一个已有的计算运行时，多个分析器可复用同一次初始化。
  pub fn runtime(mut self, runtime: Arc<ComputeRuntime>) -> Self {
    self.runtime = Some(runtime);
    self
  }

  pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
    let classifier: Arc<dyn Classifier> = Arc::new(classifier);
    self.classifier = Some(LazyModel::ready("分类模型", classifier));
    self
  }

  /// 延迟加载分类模型，首次分析时调用一次。
  pub fn classifier_loader<F, E>(mut self, load: F) -> Self
  where
    F: Fn() -> Result<Arc<dyn Classifier>, E> + Send + Sync + 'static,
    E: Display,
  {
    self.classifier = Some(LazyModel::new("分类模型", load));
    self
  }

  pub fn locator(mut self, locator: impl FaceLocator + 'static) -> Self {
    let locator: Arc<dyn FaceLocator> = Arc::new(locator);
    self.locator = Some(LazyModel::ready("人脸模型", locator));
    self
  }

  pub fn locator_loader<F, E>(mut self, load: F) -> Self
  where
    F: Fn() -> Result<Arc<dyn FaceLocator>, E> + Send + Sync + 'static,
    E: Display,
  {
    self.locator = Some(LazyModel::new("人脸模型", load));
    self
  }

  pub fn store(self, store: impl ObjectStore + 'static) -> Self {
    self.shared_store(Arc::new(store))
  }

  pub fn shared_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
    self.store = Some(store);
    self
  }

  pub fn build(self) -> Result<Analyzer, AnalyzeError> {
    let classifier = self
      .classifier
      .ok_or_else(|| AnalyzeError::BackendUnavailable("未配置分类模型".to_string()))?;

    Ok(Analyzer {
      config: self.config,
      runtime: self.runtime.unwrap_or_default(),
      classifier,
      locator: self.locator,
      store: self.store,
    })
  }
}

/// 肤色分析器，可通过 `Arc` 在多个请求线程间共享。
pub struct Analyzer {
  config: AnalyzerConfig,
  runtime: Arc<ComputeRuntime>,
  classifier: LazyModel<dyn Classifier>,
  locator: Option<LazyModel<dyn FaceLocator>>,
  store: Option<Arc<dyn ObjectStore>>,
}

impl Analyzer {
  pub fn builder() -> AnalyzerBuilder {
    AnalyzerBuilder {
      config: AnalyzerConfig::default(),
      runtime: None,
      classifier: None,
      locator: None,
      store: None,
    }
  }

  pub fn config(&self) -> &AnalyzerConfig {
    &self.config
  }

  pub fn runtime(&self) -> &ComputeRuntime {
    &self.runtime
  }

  /// 丢弃运行时与模型缓存，下一次分析会重新初始化。
  pub fn reset(&self) {
    info!("重置分析器");
    self.runtime.reset();
    self.classifier.reset();
    if let Some(locator) = &self.locator {
      locator.reset();
    }
  }

  /// 请求号由进程号与进程内序号组成，同一存储上的对象路径不会重复。
  fn next_request_id(&self) -> String {
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{:X}-{:08X}", std::process::id(), seq)
  }

  /// 校验原始字节后分析。
  pub fn analyze_bytes(&self, data: Vec<u8>, mime: &str) -> Result<Analysis, AnalyzeError> {
    let source = SourceImage::with_limit(data, mime, self.config.max_source_bytes)?;
    self.analyze(&source)
  }

  pub fn analyze(&self, source: &SourceImage) -> Result<Analysis, AnalyzeError> {
    if source.len() > self.config.max_source_bytes {
      return Err(AnalyzeError::InvalidInput(crate::input::InputError::TooLarge {
        size: source.len(),
        limit: self.config.max_source_bytes,
      }));
    }

    let request_id = self.next_request_id();
    let started = Instant::now();
    info!("[{}] 开始分析: {} 字节 ({})", request_id, source.len(), source.mime());

    self.runtime.ensure_ready()?;
    let classifier = self.classifier.get()?;

    let (locator, locator_failure) = match &self.locator {
      None => (None, None),
      Some(lazy) => match lazy.get() {
        Ok(locator) => (Some(locator), None),
        Err(e) => {
          warn!("[{}] 人脸模型不可用，使用整幅图像: {}", request_id, e);
          (None, Some(e.to_string()))
        }
      },
    };

    let Preprocessed {
      tensor,
      processed,
      luminance,
      detection,
      crop,
      source_size,
    } = preprocess(
      source,
      locator.as_deref(),
      &self.runtime,
      self.config.crop_padding,
    )?;
    let detection = match locator_failure {
      Some(reason) => StageOutcome::Degraded(reason),
      None => detection,
    };

    let prediction = {
      let now = Instant::now();
      let prediction = classifier.predict(&tensor);
      drop(tensor);
      info!("[{}] 推理完成，耗时: {:.2?}", request_id, now.elapsed());
      prediction?
    };

    let result = ClassificationResult::compose(prediction.top1(), luminance, &detection);
    info!(
      "[{}] 预测 {} -> {}（亮度 {:.1}，人脸 {}），色组 {}",
      request_id,
      result.raw_label,
      result.adjusted_label,
      result.luminance,
      result.face_detected,
      result.tone_group
    );

    let now = Utc::now();
    let store = self.store.as_deref();
    let original = upload_or_fallback(
      store,
      &request_id,
      &format!("original.{}", source.extension()),
      &object_path(&now, &request_id, "original", source.extension()),
      source.mime(),
      source.bytes().to_vec(),
    );
    let processed_artifact = match encode_png(&processed) {
      Ok(bytes) => upload_or_fallback(
        store,
        &request_id,
        "processed.png",
        &object_path(&now, &request_id, "processed", "png"),
        PNG_MIME,
        bytes,
      ),
      Err(e) => {
        warn!("[{}] 处理后图像编码失败: {}", request_id, e);
        Artifact {
          name: "processed.png".to_string(),
          content_type: PNG_MIME.to_string(),
          bytes: Vec::new(),
          upload: StageOutcome::degraded(e.to_string()),
          local_url: memory_url(&request_id, "processed.png"),
        }
      }
    };

    let record = OutputRecord::new(&result, original.url(), processed_artifact.url());
    info!("[{}] 分析完成，耗时: {:.2?}", request_id, started.elapsed());

    Ok(Analysis {
      request_id,
      result,
      record,
      detection,
      crop,
      source_size,
      processed,
      original,
      processed_artifact,
    })
  }
}

fn object_path(now: &DateTime<Utc>, request_id: &str, kind: &str, extension: &str) -> String {
  format!(
    "{}/{}-{}-{}.{}",
    now.format("%Y/%m/%d"),
    now.format("%H-%M-%S"),
    request_id,
    kind,
    extension
  )
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
  let mut buffer = Vec::new();
  image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
  Ok(buffer)
}
