// 该文件是 Huojing （火警） 项目的一部分。
// src/service.rs - 预测服务
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

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, instrument};

use crate::{
  classify::{ClassifyError, Classifier, PredictionResult},
  frame::ImageTensor,
  input::{DecodeError, FetchError, ImageFetcher, decode},
  model::Model,
};

pub const INVALID_FORMAT_DETAIL: &str = "Invalid image format.";

#[derive(Error, Debug)]
pub enum PredictError {
  #[error(transparent)]
  Fetch(#[from] FetchError),
  #[error(transparent)]
  Decode(#[from] DecodeError),
  #[error(transparent)]
  Classify(#[from] ClassifyError),
  #[error("inference task aborted: {0}")]
  Join(#[from] JoinError),
}

impl PredictError {
  pub fn status(&self) -> StatusCode {
    match self {
      PredictError::Fetch(_) | PredictError::Decode(DecodeError::InvalidFormat(_)) => {
        StatusCode::BAD_REQUEST
      }
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

/// 返回给调用方的错误，响应体为 `{"detail": "..."}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
  pub status: StatusCode,
  pub detail: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
  detail: &'a str,
}

impl RequestError {
  pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
    Self {
      status,
      detail: detail.into(),
    }
  }
}

impl From<PredictError> for RequestError {
  fn from(err: PredictError) -> Self {
    let status = err.status();
    let detail = match &err {
      PredictError::Fetch(e) => e.to_string(),
      PredictError::Decode(DecodeError::InvalidFormat(_)) => INVALID_FORMAT_DETAIL.to_string(),
      other => format!("Prediction failed: {other}"),
    };
    Self { status, detail }
  }
}

impl IntoResponse for RequestError {
  fn into_response(self) -> Response {
    (
      self.status,
      Json(ErrorBody {
        detail: &self.detail,
      }),
    )
      .into_response()
  }
}

/// 串联 获取 -> 解码 -> 推理；每个请求独立，不共享可变状态
pub struct PredictionService<M> {
  fetcher: ImageFetcher,
  classifier: Arc<Classifier<M>>,
}

impl<M> PredictionService<M>
where
  M: Model<Input = ImageTensor> + Send + Sync + 'static,
  M::Output: AsRef<[f32]>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(fetcher: ImageFetcher, model: M) -> Self {
    Self {
      fetcher,
      classifier: Arc::new(Classifier::new(model)),
    }
  }

  #[instrument(skip(self))]
  pub async fn predict(&self, url: &str) -> Result<PredictionResult, PredictError> {
    debug!("获取图像");
    let bytes = self.fetcher.fetch(url).await?;

    // 解码与推理都是 CPU 密集任务，放到阻塞线程池
    let classifier = Arc::clone(&self.classifier);
    tokio::task::spawn_blocking(move || -> Result<PredictionResult, PredictError> {
      debug!("解码图像");
      let tensor = decode(&bytes)?;
      debug!("执行推理");
      Ok(classifier.classify(&tensor)?)
    })
    .await?
  }
}
