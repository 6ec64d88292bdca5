// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/storage/directory_store.rs - 目录对象存储
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
  fs::OpenOptions,
  io::Write,
  path::{Component, Path, PathBuf},
};

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  storage::{ObjectStore, UploadError},
};

/// 把对象写入本地目录，返回 `file://` 地址。
#[derive(Debug, Clone)]
pub struct DirectoryStore {
  root: PathBuf,
}

impl FromUrlWithScheme for DirectoryStore {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryStore {
  type Error = UploadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(UploadError::SchemeMismatch(format!(
        "期望存储方式 '{}', 实际存储方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    let root = url
      .to_file_path()
      .map_err(|_| UploadError::InvalidPath(url.to_string()))?;
    Ok(DirectoryStore::new(root))
  }
}

impl DirectoryStore {
  pub fn new(root: impl AsRef<Path>) -> Self {
    DirectoryStore {
      root: root.as_ref().to_path_buf(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn resolve(&self, path: &str) -> Result<PathBuf, UploadError> {
    let relative = Path::new(path);
    let clean = !path.is_empty()
      && relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !clean {
      return Err(UploadError::InvalidPath(path.to_string()));
    }
    Ok(std::path::absolute(self.root.join(relative))?)
  }
}

impl ObjectStore for DirectoryStore {
  fn upload(&self, bytes: &[u8], path: &str, _content_type: &str) -> Result<Url, UploadError> {
    let target = self.resolve(path)?;
    if let Some(parent) = target.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    // 已有对象不覆盖，同名写入报错
    let mut file = OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&target)?;
    file.write_all(bytes)?;
    info!("保存文件: {}", target.display());

    Url::from_file_path(&target)
      .map_err(|_| UploadError::InvalidPath(target.display().to_string()))
  }
}
