// 该文件是 Huojing （火警） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> &'static str;
  fn from_label_id(id: usize) -> Option<Self>;
}

/// 分类标签，顺序必须与训练时的输出索引一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassLabel {
  #[serde(rename = "Fire")]
  Fire,
  #[serde(rename = "Non-Fire")]
  NonFire,
}

impl ClassLabel {
  pub const ALL: [ClassLabel; 2] = [ClassLabel::Fire, ClassLabel::NonFire];
  pub const COUNT: usize = Self::ALL.len();

  /// 与标签对应的安全提示
  pub fn tip(&self) -> &'static str {
    match self {
      ClassLabel::Fire => "Fire detected! Please notify the authorities.",
      ClassLabel::NonFire => {
        "You appear to be safe. However, check your surroundings if in doubt."
      }
    }
  }
}

impl WithLabel for ClassLabel {
  fn to_label_str(&self) -> &'static str {
    match self {
      ClassLabel::Fire => "Fire",
      ClassLabel::NonFire => "Non-Fire",
    }
  }

  fn from_label_id(id: usize) -> Option<Self> {
    Self::ALL.get(id).copied()
  }
}

impl std::fmt::Display for ClassLabel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.to_label_str())
  }
}

mod fire_net;
pub use self::fire_net::{FireNet, FireNetBuilder, FireNetError};
