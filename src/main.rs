// 该文件是 Huojing （火警） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use huojing::{
  FromUrl,
  args::Args,
  input::ImageFetcher,
  model::FireNetBuilder,
  server::{router, serve},
  service::PredictionService,
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("Huojing 火焰识别服务");
  info!("模型文件路径: {}", args.model);
  info!("监听地址: {}:{}", args.host, args.port);
  match args.fetch_timeout() {
    Some(timeout) => info!("图像获取超时: {:?}", timeout),
    None => info!("图像获取超时: 不限制"),
  }

  // 模型加载失败时直接退出，不进入服务状态
  info!("正在加载模型...");
  let model = FireNetBuilder::from_url(&args.model)?
    .build()
    .context("模型加载失败，服务无法启动")?;

  let fetcher = ImageFetcher::new(args.fetch_timeout()).context("无法创建 HTTP 客户端")?;
  let service = Arc::new(PredictionService::new(fetcher, model));
  let app = router(service);

  let addr = SocketAddr::new(args.host, args.port);
  let listener = TcpListener::bind(addr)
    .await
    .with_context(|| format!("无法监听地址: {}", addr))?;
  info!("服务已启动: http://{}", listener.local_addr()?);

  serve(listener, app).await?;

  info!("服务已退出");
  Ok(())
}
