// 该文件是 Huojing （火警） 项目的一部分。
// src/classify.rs - 推理结果解析
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

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::ImageTensor,
  model::{ClassLabel, Model, WithLabel},
};

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("model inference failed: {0}")]
  Model(Box<dyn std::error::Error + Send + Sync>),
  #[error("model returned {0} probabilities, expected {1}")]
  OutputSize(usize, usize),
  #[error("model returned a non-finite probability: {0}")]
  NonFinite(f32),
}

/// 单次请求的分类结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
  #[serde(rename = "prediction")]
  pub predicted_class: ClassLabel,
  #[serde(serialize_with = "serialize_confidence")]
  pub confidence: f32,
  pub tips: &'static str,
}

impl PredictionResult {
  /// 保留两位小数的置信度
  pub fn confidence_str(&self) -> String {
    format!("{:.2}", self.confidence)
  }
}

fn serialize_confidence<S: Serializer>(confidence: &f32, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(&format!("{:.2}", confidence))
}

/// 将概率向量转换为分类结果；概率相同时取索引较小者，即 Fire 优先
pub fn interpret(probabilities: &[f32]) -> Result<PredictionResult, ClassifyError> {
  if probabilities.len() != ClassLabel::COUNT {
    return Err(ClassifyError::OutputSize(
      probabilities.len(),
      ClassLabel::COUNT,
    ));
  }
  if let Some(&p) = probabilities.iter().find(|p| !p.is_finite()) {
    return Err(ClassifyError::NonFinite(p));
  }

  let mut best_index = 0usize;
  let mut best_score = probabilities[0];
  for (idx, &score) in probabilities.iter().enumerate().skip(1) {
    if score > best_score {
      best_score = score;
      best_index = idx;
    }
  }

  let predicted_class = ClassLabel::from_label_id(best_index)
    .ok_or(ClassifyError::OutputSize(best_index + 1, ClassLabel::COUNT))?;

  Ok(PredictionResult {
    predicted_class,
    confidence: best_score,
    tips: predicted_class.tip(),
  })
}

/// 推理引擎：持有只读模型，输入张量，输出分类结果
pub struct Classifier<M> {
  model: M,
}

impl<M> Classifier<M>
where
  M: Model<Input = ImageTensor>,
  M::Output: AsRef<[f32]>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M) -> Self {
    Self { model }
  }

  pub fn classify(&self, tensor: &ImageTensor) -> Result<PredictionResult, ClassifyError> {
    let output = self
      .model
      .infer(tensor)
      .map_err(|e| ClassifyError::Model(Box::new(e)))?;
    debug!("类别概率: {:?}", output.as_ref());

    interpret(output.as_ref())
  }
}
