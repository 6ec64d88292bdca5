// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/input.rs - 上传图像输入
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

use thiserror::Error;

/// 单个上传文件的大小上限：5 MiB。
pub const MAX_SOURCE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_MIME_PREFIX: &str = "image/";

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
  #[error("不支持的文件类型 '{0}'，仅接受 image/*")]
  UnsupportedMime(String),
  #[error("文件过大: {size} 字节，上限为 {limit} 字节")]
  TooLarge { size: usize, limit: usize },
}

/// 已通过校验的上传图像，创建后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
  data: Box<[u8]>,
  mime: String,
}

impl SourceImage {
  pub fn new(data: Vec<u8>, mime: impl Into<String>) -> Result<Self, InputError> {
    Self::with_limit(data, mime, MAX_SOURCE_BYTES)
  }

  pub fn with_limit(
    data: Vec<u8>,
    mime: impl Into<String>,
    limit: usize,
  ) -> Result<Self, InputError> {
    let mime = mime.into();
    if !mime.to_ascii_lowercase().starts_with(IMAGE_MIME_PREFIX) {
      return Err(InputError::UnsupportedMime(mime));
    }
    if data.len() > limit {
      return Err(InputError::TooLarge {
        size: data.len(),
        limit,
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      mime,
    })
  }

  pub fn bytes(&self) -> &[u8] {
    &self.data
  }

  pub fn mime(&self) -> &str {
    &self.mime
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 由 MIME 推断的文件扩展名，未知类型返回 `bin`。
  pub fn extension(&self) -> &'static str {
    image::ImageFormat::from_mime_type(&self.mime)
      .and_then(|format| format.extensions_str().first().copied())
      .unwrap_or("bin")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_image_mime() {
    let source = SourceImage::new(vec![1, 2, 3], "image/png").unwrap();
    assert_eq!(source.len(), 3);
    assert_eq!(source.mime(), "image/png");
    assert_eq!(source.extension(), "png");
  }

  #[test]
  fn mime_prefix_is_case_insensitive() {
    assert!(SourceImage::new(vec![0], "IMAGE/JPEG").is_ok());
  }

  #[test]
  fn rejects_non_image_mime() {
    let err = SourceImage::new(vec![0], "application/pdf").unwrap_err();
    assert_eq!(err, InputError::UnsupportedMime("application/pdf".into()));
  }

  #[test]
  fn rejects_oversize_payload() {
    let err = SourceImage::new(vec![0; MAX_SOURCE_BYTES + 1], "image/png").unwrap_err();
    assert_eq!(
      err,
      InputError::TooLarge {
        size: MAX_SOURCE_BYTES + 1,
        limit: MAX_SOURCE_BYTES
      }
    );
  }

  #[test]
  fn accepts_payload_at_limit() {
    assert!(SourceImage::new(vec![0; MAX_SOURCE_BYTES], "image/png").is_ok());
  }

  #[test]
  fn unknown_subtype_falls_back_to_bin_extension() {
    let source = SourceImage::new(vec![0], "image/x-unknown").unwrap();
    assert_eq!(source.extension(), "bin");
  }
}
