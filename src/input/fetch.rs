// 该文件是 Huojing （火警） 项目的一部分。
// src/input/fetch.rs - 远程图像获取
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

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Image URL is unreachable (HTTP {0}).")]
  Unreachable(StatusCode),
  #[error("Image URL is unreachable: {0}")]
  NetworkFailure(#[from] reqwest::Error),
}

/// 通过 HTTP GET 获取图像字节，不重试
#[derive(Debug, Clone)]
pub struct ImageFetcher {
  client: Client,
}

impl ImageFetcher {
  /// `timeout` 为 `None` 时不限制等待时间
  pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    Ok(Self {
      client: builder.build()?,
    })
  }

  pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
    debug!("获取图像: {}", url);
    let response = self.client.get(url).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
      debug!("图像地址返回非成功状态: {}", status);
      return Err(FetchError::Unreachable(status));
    }

    let body = response.bytes().await?;
    debug!("图像下载完成, 大小: {} 字节", body.len());
    Ok(body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fetch_invalid_url_is_network_failure() {
    let fetcher = ImageFetcher::new(Some(Duration::from_secs(1))).unwrap();
    let result = fetcher.fetch("definitely not a url").await;
    assert!(matches!(result, Err(FetchError::NetworkFailure(_))));
  }

  #[tokio::test]
  async fn test_fetch_connection_refused_is_network_failure() {
    // 先绑定再释放，得到一个当前无人监听的端口
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = ImageFetcher::new(Some(Duration::from_secs(2))).unwrap();
    let result = fetcher.fetch(&format!("http://{addr}/fire.png")).await;
    assert!(matches!(result, Err(FetchError::NetworkFailure(_))));
  }

  #[test]
  fn test_unreachable_message() {
    let err = FetchError::Unreachable(StatusCode::NOT_FOUND);
    assert_eq!(
      err.to_string(),
      "Image URL is unreachable (HTTP 404 Not Found)."
    );
  }
}
