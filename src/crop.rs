// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/crop.rs - 人脸框与裁剪区域
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

/// 人脸框四周各扩展框宽/高的 20%。
pub const FACE_PADDING_RATIO: f32 = 0.2;

/// 源图像素坐标下的人脸框。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  pub confidence: f32,
}

/// 源图中送入分类器的子区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl CropRegion {
  pub fn full(source_width: u32, source_height: u32) -> Self {
    CropRegion {
      x: 0,
      y: 0,
      width: source_width,
      height: source_height,
    }
  }

  /// 根据人脸框计算带边距的裁剪区域。
  ///
  /// 结果总在 `[0, source_width] × [0, source_height]` 内；没有人脸、
  /// 坐标非法或裁剪后面积不为正时退回整幅图像。
  pub fn from_face(
    face: Option<&FaceBox>,
    source_width: u32,
    source_height: u32,
    padding: f32,
  ) -> Self {
    let full = Self::full(source_width, source_height);
    let Some(face) = face else {
      return full;
    };

    let values = [face.x, face.y, face.width, face.height, padding];
    if values.iter().any(|v| !v.is_finite()) {
      return full;
    }

    let (w, h) = (source_width as f32, source_height as f32);
    let pad_x = face.width * padding;
    let pad_y = face.height * padding;

    let x_min = (face.x - pad_x).floor().clamp(0.0, w);
    let y_min = (face.y - pad_y).floor().clamp(0.0, h);
    let x_max = (face.x + face.width + pad_x).ceil().clamp(0.0, w);
    let y_max = (face.y + face.height + pad_y).ceil().clamp(0.0, h);

    if x_max <= x_min || y_max <= y_min {
      return full;
    }

    let x = x_min as u32;
    let y = y_min as u32;
    CropRegion {
      x,
      y,
      width: (x_max as u32 - x).min(source_width - x),
      height: (y_max as u32 - y).min(source_height - y),
    }
  }

  pub fn is_full_frame(&self, source_width: u32, source_height: u32) -> bool {
    *self == Self::full(source_width, source_height)
  }

  pub fn area(&self) -> u64 {
    self.width as u64 * self.height as u64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn face(x: f32, y: f32, width: f32, height: f32) -> FaceBox {
    FaceBox {
      x,
      y,
      width,
      height,
      confidence: 0.9,
    }
  }

  fn assert_within(region: &CropRegion, w: u32, h: u32) {
    assert!(region.width > 0 && region.height > 0, "{region:?}");
    assert!(region.x + region.width <= w, "{region:?} exceeds width {w}");
    assert!(region.y + region.height <= h, "{region:?} exceeds height {h}");
  }

  #[test]
  fn no_face_uses_full_frame() {
    let region = CropRegion::from_face(None, 640, 480, FACE_PADDING_RATIO);
    assert_eq!(region, CropRegion::full(640, 480));
    assert!(region.is_full_frame(640, 480));
  }

  #[test]
  fn centered_face_is_padded_by_twenty_percent() {
    // 100x50 的框，左右各扩 20，上下各扩 10
    let region = CropRegion::from_face(
      Some(&face(200.0, 100.0, 100.0, 50.0)),
      640,
      480,
      FACE_PADDING_RATIO,
    );
    assert_eq!(
      region,
      CropRegion {
        x: 180,
        y: 90,
        width: 140,
        height: 70
      }
    );
  }

  #[test]
  fn face_touching_top_left_is_clamped() {
    let region =
      CropRegion::from_face(Some(&face(0.0, 0.0, 50.0, 50.0)), 200, 200, FACE_PADDING_RATIO);
    assert_eq!(region.x, 0);
    assert_eq!(region.y, 0);
    assert_eq!(region.width, 60);
    assert_eq!(region.height, 60);
  }

  #[test]
  fn face_touching_bottom_right_is_clamped() {
    let region = CropRegion::from_face(
      Some(&face(150.0, 150.0, 50.0, 50.0)),
      200,
      200,
      FACE_PADDING_RATIO,
    );
    assert_eq!(region.x, 140);
    assert_eq!(region.y, 140);
    assert_within(&region, 200, 200);
  }

  #[test]
  fn box_outside_image_falls_back_to_full_frame() {
    let region = CropRegion::from_face(
      Some(&face(500.0, 500.0, 20.0, 20.0)),
      200,
      200,
      FACE_PADDING_RATIO,
    );
    assert!(region.is_full_frame(200, 200));
  }

  #[test]
  fn degenerate_box_falls_back_to_full_frame() {
    for bad in [
      face(10.0, 10.0, 0.0, 0.0),
      face(10.0, 10.0, -30.0, 20.0),
      face(f32::NAN, 10.0, 20.0, 20.0),
      face(10.0, 10.0, f32::INFINITY, 20.0),
    ] {
      let region = CropRegion::from_face(Some(&bad), 100, 100, FACE_PADDING_RATIO);
      assert!(region.is_full_frame(100, 100), "{bad:?} -> {region:?}");
    }
  }

  #[test]
  fn oversized_box_covers_whole_image() {
    let region = CropRegion::from_face(
      Some(&face(-50.0, -50.0, 400.0, 400.0)),
      120,
      80,
      FACE_PADDING_RATIO,
    );
    assert!(region.is_full_frame(120, 80));
  }

  #[test]
  fn padded_region_never_leaves_image_bounds() {
    let (w, h) = (97u32, 61u32);
    for x in (-40..=120).step_by(7) {
      for y in (-40..=80).step_by(9) {
        for size in [1.0, 5.0, 17.5, 60.0, 150.0] {
          let fb = face(x as f32 + 0.3, y as f32 + 0.7, size, size * 1.3);
          let region = CropRegion::from_face(Some(&fb), w, h, FACE_PADDING_RATIO);
          assert_within(&region, w, h);
        }
      }
    }
  }
}
