// 该文件是 Tonescope （肤色镜） 项目的一部分。
// src/compose.rs - 色组与配色推荐
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

use serde::Serialize;

use crate::{
  adjust::adjust,
  crop::FaceBox,
  error::StageOutcome,
  model::{MstLabel, Top1},
};

/// MST 量表各等级的参考色。
const MST_SWATCHES: [&str; 10] = [
  "#f6ede4", "#f3e7db", "#f7ead0", "#eadaba", "#d7bd96", "#a07e56", "#825c43", "#604134",
  "#3a312a", "#292420",
];

pub fn swatch_hex(label: MstLabel) -> &'static str {
  MST_SWATCHES[label.index()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ToneGroup {
  #[serde(rename = "light")]
  Light,
  #[serde(rename = "light medium")]
  LightMedium,
  #[serde(rename = "medium")]
  Medium,
  #[serde(rename = "medium deep")]
  MediumDeep,
  #[serde(rename = "deep")]
  Deep,
}

impl ToneGroup {
  pub const ALL: [ToneGroup; 5] = [
    ToneGroup::Light,
    ToneGroup::LightMedium,
    ToneGroup::Medium,
    ToneGroup::MediumDeep,
    ToneGroup::Deep,
  ];

  pub fn from_label(label: MstLabel) -> Self {
    match label.number() {
      0..=2 => ToneGroup::Light,
      3..=4 => ToneGroup::LightMedium,
      5..=6 => ToneGroup::Medium,
      7..=8 => ToneGroup::MediumDeep,
      _ => ToneGroup::Deep,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ToneGroup::Light => "light",
      ToneGroup::LightMedium => "light medium",
      ToneGroup::Medium => "medium",
      ToneGroup::MediumDeep => "medium deep",
      ToneGroup::Deep => "deep",
    }
  }

  pub fn recommendations(self) -> &'static RecommendationBundle {
    match self {
      ToneGroup::Light => &LIGHT,
      ToneGroup::LightMedium => &LIGHT_MEDIUM,
      ToneGroup::Medium => &MEDIUM,
      ToneGroup::MediumDeep => &MEDIUM_DEEP,
      ToneGroup::Deep => &DEEP,
    }
  }
}

impl std::fmt::Display for ToneGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorSwatch {
  pub name: &'static str,
  pub hex: &'static str,
}

const fn swatch(name: &'static str, hex: &'static str) -> ColorSwatch {
  ColorSwatch { name, hex }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RecommendationBundle {
  pub recommended: &'static [ColorSwatch],
  pub avoid: &'static [ColorSwatch],
}

static LIGHT: RecommendationBundle = RecommendationBundle {
  recommended: &[
    swatch("Navy", "#1f3a5f"),
    swatch("Emerald", "#2e8b57"),
    swatch("Burgundy", "#800020"),
    swatch("Soft Pink", "#f4c2c2"),
    swatch("Lavender", "#b57edc"),
    swatch("Charcoal", "#36454f"),
  ],
  avoid: &[
    swatch("Pale Yellow", "#ffffe0"),
    swatch("Beige", "#f5f5dc"),
    swatch("Neon Orange", "#ff5f1f"),
  ],
};

static LIGHT_MEDIUM: RecommendationBundle = RecommendationBundle {
  recommended: &[
    swatch("Teal", "#008080"),
    swatch("Coral", "#ff7f50"),
    swatch("Dusty Rose", "#dcae96"),
    swatch("Royal Blue", "#4169e1"),
    swatch("Olive", "#808000"),
    swatch("Plum", "#8e4585"),
  ],
  avoid: &[
    swatch("Khaki", "#c3b091"),
    swatch("Pastel Orange", "#ffb347"),
    swatch("Silver Gray", "#c0c0c0"),
  ],
};

static MEDIUM: RecommendationBundle = RecommendationBundle {
  recommended: &[
    swatch("Mustard", "#e1ad01"),
    swatch("Terracotta", "#e2725b"),
    swatch("Forest Green", "#228b22"),
    swatch("Cobalt", "#0047ab"),
    swatch("Warm Red", "#c0392b"),
    swatch("Cream", "#fffdd0"),
  ],
  avoid: &[
    swatch("Camel", "#c19a6b"),
    swatch("Tan", "#d2b48c"),
    swatch("Pastel Gray", "#cfcfc4"),
  ],
};

static MEDIUM_DEEP: RecommendationBundle = RecommendationBundle {
  recommended: &[
    swatch("Emerald", "#50c878"),
    swatch("Fuchsia", "#ff00ff"),
    swatch("Cobalt", "#0047ab"),
    swatch("Gold", "#ffd700"),
    swatch("White", "#ffffff"),
    swatch("Tangerine", "#f28500"),
  ],
  avoid: &[
    swatch("Saddle Brown", "#8b4513"),
    swatch("Olive Drab", "#6b8e23"),
    swatch("Mauve", "#e0b0ff"),
  ],
};

static DEEP: RecommendationBundle = RecommendationBundle {
  recommended: &[
    swatch("Bright White", "#fdfdfd"),
    swatch("Royal Purple", "#7851a9"),
    swatch("Hot Pink", "#ff69b4"),
    swatch("Electric Blue", "#7df9ff"),
    swatch("Amber", "#ffbf00"),
    swatch("Ruby", "#e0115f"),
  ],
  avoid: &[
    swatch("Dark Brown", "#5c4033"),
    swatch("Navy", "#000080"),
    swatch("Charcoal", "#36454f"),
  ],
};

/// 单次分析的分类结果，创建后不可变。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
  pub raw_label: MstLabel,
  pub adjusted_label: MstLabel,
  pub confidence: f32,
  pub luminance: f32,
  pub face_detected: bool,
  pub tone_group: ToneGroup,
  pub recommendations: &'static RecommendationBundle,
}

impl ClassificationResult {
  pub fn compose(top: Top1, luminance: f32, detection: &StageOutcome<FaceBox>) -> Self {
    let adjusted_label = adjust(top.label, luminance);
    let tone_group = ToneGroup::from_label(adjusted_label);
    ClassificationResult {
      raw_label: top.label,
      adjusted_label,
      confidence: top.confidence.clamp(0.0, 1.0),
      luminance: luminance.clamp(0.0, 255.0),
      face_detected: detection.is_ok(),
      tone_group,
      recommendations: tone_group.recommendations(),
    }
  }
}

/// 交给界面/命令行层的最终记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
  pub prediction: MstLabel,
  pub raw_prediction: MstLabel,
  /// 百分比，保留两位小数。
  pub confidence: f32,
  pub mst_color: &'static str,
  pub mst_index: u8,
  pub luminance: f32,
  pub image_url: String,
  pub processed_image_url: String,
  pub face_detected: bool,
  pub skin_tone_group: ToneGroup,
  pub recommendations: &'static RecommendationBundle,
}

impl OutputRecord {
  pub fn new(
    result: &ClassificationResult,
    image_url: impl Into<String>,
    processed_image_url: impl Into<String>,
  ) -> Self {
    OutputRecord {
      prediction: result.adjusted_label,
      raw_prediction: result.raw_label,
      confidence: (result.confidence * 10000.0).round() / 100.0,
      mst_color: swatch_hex(result.adjusted_label),
      mst_index: result.adjusted_label.index() as u8,
      luminance: (result.luminance * 100.0).round() / 100.0,
      image_url: image_url.into(),
      processed_image_url: processed_image_url.into(),
      face_detected: result.face_detected,
      skin_tone_group: result.tone_group,
      recommendations: result.recommendations,
    }
  }
}
