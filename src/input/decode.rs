// 该文件是 Huojing （火警） 项目的一部分。
// src/input/decode.rs - 图像解码与归一化
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

use std::io::Cursor;

use image::{ImageError, ImageReader, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::frame::{INPUT_H, INPUT_W, ImageTensor, RgbNhwcTensor};

const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("Invalid image format: {0}")]
  InvalidFormat(ImageError),
  #[error("Image processing error: {0}")]
  Unexpected(ImageError),
}

impl From<ImageError> for DecodeError {
  fn from(err: ImageError) -> Self {
    match err {
      // 数据来自内存，I/O 错误只可能是数据被截断
      ImageError::Decoding(_) | ImageError::Unsupported(_) | ImageError::IoError(_) => {
        DecodeError::InvalidFormat(err)
      }
      other => DecodeError::Unexpected(other),
    }
  }
}

impl From<std::io::Error> for DecodeError {
  fn from(err: std::io::Error) -> Self {
    DecodeError::from(ImageError::IoError(err))
  }
}

/// 解码为模型输入张量 (1, 224, 224, 3)
pub fn decode(bytes: &[u8]) -> Result<ImageTensor, DecodeError> {
  decode_to_tensor::<INPUT_W, INPUT_H>(bytes)
}

/// 解码任意常见格式，转换为 RGB，拉伸缩放到 W x H 并归一化到 [0.0, 1.0]
pub fn decode_to_tensor<const W: u32, const H: u32>(
  bytes: &[u8],
) -> Result<RgbNhwcTensor<W, H>, DecodeError> {
  let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
  debug!("猜测的图像格式: {:?}", reader.format());

  let image = reader.decode()?;
  debug!(
    "图像解码完成: {}x{} {:?}",
    image.width(),
    image.height(),
    image.color()
  );

  // 灰度、带透明通道、调色板等统一转为三通道 RGB，透明通道直接丢弃
  let rgb = image.to_rgb8();
  let resized = image::imageops::resize(&rgb, W, H, RESIZE_FILTER);

  Ok(RgbNhwcTensor::from(&resized))
}
