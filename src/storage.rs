// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/storage.rs - 对象存储网关
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

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{FromUrl, error::StageOutcome};

#[cfg(feature = "directory_record")]
mod directory_store;
#[cfg(feature = "directory_record")]
pub use self::directory_store::DirectoryStore;

/// 本地回退地址的方案，表示数据只保存在本次结果的内存中。
pub const MEMORY_SCHEME: &str = "memory";

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("对象路径无效: {0}")]
  InvalidPath(String),
  #[error("存储拒绝: {0}")]
  Rejected(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub trait ObjectStore: Send + Sync {
  fn upload(&self, bytes: &[u8], path: &str, content_type: &str) -> Result<Url, UploadError>;
}

/// 一次分析产生的图像文件及其访问地址。
#[derive(Debug, Clone)]
pub struct Artifact {
  pub name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
  pub upload: StageOutcome<Url>,
  pub local_url: String,
}

impl Artifact {
  /// 上传成功时为公开地址，否则为本地回退地址。
  pub fn url(&self) -> String {
    match &self.upload {
      StageOutcome::Ok(url) => url.to_string(),
      StageOutcome::Degraded(_) => self.local_url.clone(),
    }
  }
}

pub fn memory_url(request_id: &str, name: &str) -> String {
  format!("{}://{}/{}", MEMORY_SCHEME, request_id, name)
}

/// 尽力上传：任何失败都只记录并降级，不会向上传播。
pub fn upload_or_fallback(
  store: Option<&dyn ObjectStore>,
  request_id: &str,
  name: &str,
  path: &str,
  content_type: &str,
  bytes: Vec<u8>,
) -> Artifact {
  let upload = match store {
    None => StageOutcome::degraded("未配置对象存储"),
    Some(store) => match store.upload(&bytes, path, content_type) {
      Ok(url) => {
        debug!("上传完成: {} -> {}", path, url);
        StageOutcome::Ok(url)
      }
      Err(e) => {
        warn!("上传失败，使用本地地址: {}: {}", path, e);
        StageOutcome::degraded(e.to_string())
      }
    },
  };

  Artifact {
    name: name.to_string(),
    content_type: content_type.to_string(),
    local_url: memory_url(request_id, name),
    bytes,
    upload,
  }
}

/// 按 URL 方案选择的对象存储。
pub enum StoreWrapper {
  #[cfg(feature = "directory_record")]
  Directory(DirectoryStore),
}

impl FromUrl for StoreWrapper {
  type Error = UploadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "directory_record")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == DirectoryStore::SCHEME {
        return Ok(StoreWrapper::Directory(DirectoryStore::from_url(url)?));
      }
    }
    Err(UploadError::SchemeMismatch(format!(
      "不支持的存储方案: {}",
      url.scheme()
    )))
  }
}

impl StoreWrapper {
  pub fn into_store(self) -> Arc<dyn ObjectStore> {
    match self {
      #[cfg(feature = "directory_record")]
      StoreWrapper::Directory(store) => Arc::new(store),
    }
  }
}
