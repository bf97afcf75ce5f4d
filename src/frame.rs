// 该文件是 Huojing （火警） 项目的一部分。
// src/frame.rs - NHWC 浮点张量定义
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

use image::RgbImage;

const RGB_CHANNELS: usize = 3;
const BATCH_SIZE: usize = 1;

/// 模型输入宽度
pub const INPUT_W: u32 = 224;
/// 模型输入高度
pub const INPUT_H: u32 = 224;

/// 模型输入张量，形状 (1, 224, 224, 3)
pub type ImageTensor = RgbNhwcTensor<INPUT_W, INPUT_H>;

pub trait AsNhwcTensor {
  fn as_nhwc(&self) -> &[f32];
  fn shape(&self) -> [usize; 4];
}

/// RGB 通道顺序、取值范围 [0.0, 1.0] 的 NHWC 张量，批大小固定为 1
#[derive(Debug, Clone, PartialEq)]
pub struct RgbNhwcTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> RgbNhwcTensor<W, H> {
  const LEN: usize = BATCH_SIZE * (H as usize) * (W as usize) * RGB_CHANNELS;
}

impl<const W: u32, const H: u32> Default for RgbNhwcTensor<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0.0f32; Self::LEN].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsNhwcTensor for RgbNhwcTensor<W, H> {
  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  fn shape(&self) -> [usize; 4] {
    [BATCH_SIZE, H as usize, W as usize, RGB_CHANNELS]
  }
}

/// 图像尺寸必须已经是 W x H，否则 panic；缩放由预处理阶段负责
impl<const W: u32, const H: u32> From<&RgbImage> for RgbNhwcTensor<W, H> {
  fn from(image: &RgbImage) -> Self {
    assert_eq!(
      image.dimensions(),
      (W, H),
      "图像尺寸不匹配: 期望 {}x{}",
      W,
      H
    );

    // RgbImage 的内存布局本身就是 HWC
    let data = image
      .as_raw()
      .iter()
      .map(|&v| v as f32 / 255.0)
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self { data }
  }
}
