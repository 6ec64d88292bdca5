// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::ImageFormat;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{InputError, SourceImage},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("文件路径无效: {0}")]
  InvalidPath(String),
  #[error("无法根据扩展名识别图像类型: {0}")]
  UnknownFormat(String),
  #[error("{0}")]
  Invalid(#[from] InputError),
}

/// 从本地文件读取一张图片，作为只产出一次的输入源。
///
/// MIME 默认由扩展名推断，可用 `?mime=image/png` 覆盖。
pub struct ImageFileInput {
  source: Option<SourceImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let path = url
      .to_file_path()
      .map_err(|_| ImageFileInputError::InvalidPath(url.to_string()))?;
    let mime = match url.query_pairs().find(|(k, _)| k == "mime") {
      Some((_, v)) => v.into_owned(),
      None => mime_from_path(&path)?,
    };

    let data = std::fs::read(&path)?;
    debug!(
      "读取图像文件: {} ({} 字节, {})",
      path.display(),
      data.len(),
      mime
    );

    Ok(ImageFileInput {
      source: Some(SourceImage::new(data, mime)?),
    })
  }
}

fn mime_from_path(path: &Path) -> Result<String, ImageFileInputError> {
  ImageFormat::from_path(path)
    .map(|format| format.to_mime_type().to_string())
    .map_err(|_| ImageFileInputError::UnknownFormat(path.display().to_string()))
}

impl ImageFileInput {
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let mime = mime_from_path(path)?;
    let data = std::fs::read(path)?;
    Ok(ImageFileInput {
      source: Some(SourceImage::new(data, mime)?),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = SourceImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.source.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]))
      .save(&path)
      .unwrap();
    path
  }

  #[test]
  fn reads_file_once_with_inferred_mime() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "face.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();

    let mut input = ImageFileInput::from_url(&url).unwrap();
    let source = input.next().unwrap();
    assert_eq!(source.mime(), "image/png");
    assert!(!source.is_empty());
    assert!(input.next().is_none());
  }

  #[test]
  fn reads_percent_encoded_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "my face.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    assert!(url.path().contains("%20"));

    let source = ImageFileInput::from_url(&url).unwrap().next().unwrap();
    assert_eq!(source.bytes(), std::fs::read(&path).unwrap().as_slice());
  }

  #[test]
  fn mime_query_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "face.png");
    let url = Url::parse(&format!("image://{}?mime=image/x-custom", path.display())).unwrap();

    let source = ImageFileInput::from_url(&url).unwrap().next().unwrap();
    assert_eq!(source.mime(), "image/x-custom");
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("folder:///tmp/face.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn unknown_extension_is_reported() {
    let url = Url::parse("image:///tmp/face.txt").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::UnknownFormat(_))
    ));
  }
}
