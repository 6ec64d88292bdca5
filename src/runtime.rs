// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/runtime.rs - 计算后端初始化与张量租约
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
  sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
  },
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
  #[error("初始化失败: {0}")]
  InitFailed(String),
  #[error("此前初始化已失败，需要重置后重试: {0}")]
  PreviouslyFailed(String),
}

enum Slot<T: ?Sized> {
  Empty,
  Ready(Arc<T>),
  Failed(String),
}

/// 只初始化一次的共享句柄。
///
/// 并发调用者在同一把锁上等待，观察到的是同一次初始化的结果。
/// 失败结果会被缓存，直到调用 [`InitCell::reset`]。
pub struct InitCell<T: ?Sized> {
  slot: Mutex<Slot<T>>,
}

impl<T: ?Sized> Default for InitCell<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: ?Sized> InitCell<T> {
  pub const fn new() -> Self {
    Self {
      slot: Mutex::new(Slot::Empty),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Slot<T>> {
    self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn get_or_try_init<E, F>(&self, init: F) -> Result<Arc<T>, RuntimeError>
  where
    E: Display,
    F: FnOnce() -> Result<Arc<T>, E>,
  {
    let mut slot = self.lock();
    match &*slot {
      Slot::Ready(value) => return Ok(value.clone()),
      Slot::Failed(reason) => return Err(RuntimeError::PreviouslyFailed(reason.clone())),
      Slot::Empty => {}
    }

    match init() {
      Ok(value) => {
        *slot = Slot::Ready(value.clone());
        Ok(value)
      }
      Err(e) => {
        let reason = e.to_string();
        *slot = Slot::Failed(reason.clone());
        Err(RuntimeError::InitFailed(reason))
      }
    }
  }

  pub fn get(&self) -> Option<Arc<T>> {
    match &*self.lock() {
      Slot::Ready(value) => Some(value.clone()),
      _ => None,
    }
  }

  pub fn is_ready(&self) -> bool {
    matches!(&*self.lock(), Slot::Ready(_))
  }

  pub fn reset(&self) {
    *self.lock() = Slot::Empty;
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendInfo {
  pub name: String,
  pub threads: usize,
}

pub trait Backend: Send + Sync {
  fn name(&self) -> &str;
  fn initialize(&self) -> Result<BackendInfo, RuntimeError>;
}

/// 纯 CPU 后端，推理由注入的模型自行完成。
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl Backend for CpuBackend {
  fn name(&self) -> &str {
    "cpu"
  }

  fn initialize(&self) -> Result<BackendInfo, RuntimeError> {
    let threads = std::thread::available_parallelism()
      .map(|n| n.get())
      .unwrap_or(1);
    Ok(BackendInfo {
      name: self.name().to_string(),
      threads,
    })
  }
}

/// 进程级计算运行时。
pub struct ComputeRuntime {
  backend: Box<dyn Backend>,
  ready: InitCell<BackendInfo>,
  live: Arc<AtomicUsize>,
}

impl Default for ComputeRuntime {
  fn default() -> Self {
    Self::new(CpuBackend)
  }
}

impl ComputeRuntime {
  pub fn new(backend: impl Backend + 'static) -> Self {
    Self {
      backend: Box::new(backend),
      ready: InitCell::new(),
      live: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn ensure_ready(&self) -> Result<Arc<BackendInfo>, RuntimeError> {
    self
      .ready
      .get_or_try_init(|| {
        info!("初始化计算后端: {}", self.backend.name());
        let info = self.backend.initialize().inspect_err(|e| {
          error!("计算后端初始化失败: {}", e);
        })?;
        debug!("计算后端就绪: {:?}", info);
        Ok::<_, RuntimeError>(Arc::new(info))
      })
  }

  pub fn is_ready(&self) -> bool {
    self.ready.is_ready()
  }

  /// 丢弃已缓存的初始化结果，下次调用 `ensure_ready` 会重新初始化。
  pub fn reset(&self) {
    let live = self.live_tensors();
    if live > 0 {
      warn!("重置计算后端时仍有 {} 个张量未释放", live);
    }
    self.ready.reset();
  }

  pub fn lease(&self) -> TensorLease {
    self.live.fetch_add(1, Ordering::AcqRel);
    TensorLease {
      live: self.live.clone(),
    }
  }

  pub fn live_tensors(&self) -> usize {
    self.live.load(Ordering::Acquire)
  }
}

/// 张量占用的后端资源，析构时归还。
#[derive(Debug)]
pub struct TensorLease {
  live: Arc<AtomicUsize>,
}

impl Drop for TensorLease {
  fn drop(&mut self) {
    self.live.fetch_sub(1, Ordering::AcqRel);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Barrier;
  use std::thread;
  use std::time::Duration;

  struct CountingBackend {
    calls: Arc<AtomicUsize>,
    fail: bool,
  }

  impl Backend for CountingBackend {
    fn name(&self) -> &str {
      "counting"
    }

    fn initialize(&self) -> Result<BackendInfo, RuntimeError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      thread::sleep(Duration::from_millis(20));
      if self.fail {
        return Err(RuntimeError::InitFailed("device missing".into()));
      }
      Ok(BackendInfo {
        name: "counting".into(),
        threads: 1,
      })
    }
  }

  fn counting_runtime(fail: bool) -> (Arc<ComputeRuntime>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = ComputeRuntime::new(CountingBackend {
      calls: calls.clone(),
      fail,
    });
    (Arc::new(runtime), calls)
  }

  #[test]
  fn concurrent_callers_share_one_initialization() {
    let (runtime, calls) = counting_runtime(false);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let runtime = runtime.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
          barrier.wait();
          runtime.ensure_ready().unwrap()
        })
      })
      .collect();

    let infos: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for info in &infos {
      assert!(Arc::ptr_eq(info, &infos[0]));
    }
  }

  #[test]
  fn failure_is_cached_until_reset() {
    let (runtime, calls) = counting_runtime(true);

    assert!(matches!(
      runtime.ensure_ready(),
      Err(RuntimeError::InitFailed(_))
    ));
    assert!(matches!(
      runtime.ensure_ready(),
      Err(RuntimeError::PreviouslyFailed(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    runtime.reset();
    assert!(runtime.ensure_ready().is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn reset_allows_reinitialization() {
    let (runtime, calls) = counting_runtime(false);
    runtime.ensure_ready().unwrap();
    assert!(runtime.is_ready());
    runtime.reset();
    assert!(!runtime.is_ready());
    runtime.ensure_ready().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn leases_are_returned_on_drop() {
    let runtime = ComputeRuntime::default();
    let a = runtime.lease();
    let b = runtime.lease();
    assert_eq!(runtime.live_tensors(), 2);
    drop(a);
    assert_eq!(runtime.live_tensors(), 1);
    drop(b);
    assert_eq!(runtime.live_tensors(), 0);
  }

  #[test]
  fn init_cell_holds_unsized_values() {
    let cell: InitCell<str> = InitCell::new();
    let value = cell
      .get_or_try_init(|| Ok::<_, String>(Arc::from("模型")))
      .unwrap();
    assert_eq!(&*value, "模型");
    assert_eq!(cell.get().as_deref(), Some("模型"));
  }
}
