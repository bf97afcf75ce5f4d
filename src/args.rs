// 该文件是 Huojing （火警） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{net::IpAddr, time::Duration};

use clap::Parser;
use url::Url;

/// Huojing 服务参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 监听端口
  #[arg(long, env = "PORT", default_value_t = 8000, value_name = "PORT")]
  pub port: u16,

  /// 监听地址
  #[arg(long, env = "HOST", default_value = "0.0.0.0", value_name = "ADDR")]
  pub host: IpAddr,

  /// 模型文件路径
  /// 支持格式:
  /// - onnx:model/model_fire.onnx（相对路径）
  /// - onnx:///srv/model_fire.onnx 或 file:///srv/model_fire.onnx（绝对路径）
  #[arg(
    long,
    env = "MODEL_URL",
    default_value = "onnx:model/model_fire.onnx",
    value_name = "MODEL"
  )]
  pub model: Url,

  /// 获取远程图像的超时时间（秒，0 表示不限制）
  #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30, value_name = "SECONDS")]
  pub fetch_timeout: u64,
}

impl Args {
  pub fn fetch_timeout(&self) -> Option<Duration> {
    (self.fetch_timeout > 0).then(|| Duration::from_secs(self.fetch_timeout))
  }
}
