// 该文件是 Huojing （火警） 项目的一部分。
// src/server.rs - HTTP 接口
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
  Json, Router,
  extract::{State, rejection::JsonRejection},
  routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
  classify::PredictionResult,
  frame::ImageTensor,
  model::Model,
  service::{PredictionService, RequestError},
};

pub const ROOT_MESSAGE: &str = "Fire and Non-Fire classification API is running!";

/// `POST /predict` 请求体
#[derive(Debug, Deserialize)]
pub struct ImageUrl {
  pub url: String,
}

pub fn router<M>(service: Arc<PredictionService<M>>) -> Router
where
  M: Model<Input = ImageTensor> + Send + Sync + 'static,
  M::Output: AsRef<[f32]>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(read_root))
    .route("/predict", post(predict::<M>))
    .layer(TraceLayer::new_for_http())
    .with_state(service)
}

async fn read_root() -> Json<Value> {
  Json(json!({ "message": ROOT_MESSAGE }))
}

async fn predict<M>(
  State(service): State<Arc<PredictionService<M>>>,
  payload: Result<Json<ImageUrl>, JsonRejection>,
) -> Result<Json<PredictionResult>, RequestError>
where
  M: Model<Input = ImageTensor> + Send + Sync + 'static,
  M::Output: AsRef<[f32]>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let Json(ImageUrl { url }) = payload.map_err(|rejection| {
    warn!("请求体无效: {}", rejection.body_text());
    RequestError::new(rejection.status(), rejection.body_text())
  })?;

  match service.predict(&url).await {
    Ok(result) => {
      info!(
        "预测完成: {} -> {} ({})",
        url,
        result.predicted_class,
        result.confidence_str()
      );
      Ok(Json(result))
    }
    Err(err) => {
      let err = RequestError::from(err);
      if err.status.is_client_error() {
        warn!("预测请求失败: {} -> {}", url, err.detail);
      } else {
        error!("预测过程出错: {} -> {}", url, err.detail);
      }
      Err(err)
    }
  }
}

/// 运行服务直到收到 Ctrl-C 或 SIGTERM，处理中的请求会被完成
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!("无法监听 Ctrl-C 信号: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        error!("无法监听 SIGTERM 信号: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("收到中断信号，准备退出...");
}
