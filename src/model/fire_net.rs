// 该文件是 Huojing （火警） 项目的一部分。
// src/model/fire_net.rs - 火焰分类模型
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

use std::{
  any::Any,
  panic::AssertUnwindSafe,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNhwcTensor, INPUT_H, INPUT_W, ImageTensor},
  model::{ClassLabel, Model},
};

const FIRE_NET_SCHEME: &str = "onnx";
const FILE_SCHEME: &str = "file";

/// 已加载的分类模型，启动后只读
pub struct FireNet {
  plan: TypedRunnableModel<TypedModel>,
}

#[derive(Error, Debug)]
pub enum FireNetError {
  #[error("模型文件不存在: {}", .0.display())]
  ModelNotFound(PathBuf),
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, TractError),
  #[error("推理错误: {0}")]
  TractError(TractError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<std::io::Error> for FireNetError {
  fn from(err: std::io::Error) -> Self {
    FireNetError::ModelLoadError(err)
  }
}

impl From<TractError> for FireNetError {
  fn from(err: TractError) -> Self {
    FireNetError::TractError(err)
  }
}

impl FireNetError {
  pub fn invalid(msg: &str, e: TractError) -> Self {
    FireNetError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct FireNetBuilder {
  model_path: PathBuf,
}

impl FromUrl for FireNetBuilder {
  type Error = FireNetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME && url.scheme() != FILE_SCHEME {
      return Err(FireNetError::ModelPathError(format!(
        "模型路径必须使用 {} 或 {} 方案, 实际为 {}",
        Self::SCHEME,
        FILE_SCHEME,
        url.scheme()
      )));
    }

    if url.path().is_empty() {
      return Err(FireNetError::ModelPathError("模型路径为空".to_string()));
    }

    Ok(FireNetBuilder::new(url.path()))
  }
}

impl FromUrlWithScheme for FireNetBuilder {
  const SCHEME: &'static str = FIRE_NET_SCHEME;
}

impl FireNetBuilder {
  pub fn new(model_path: impl AsRef<Path>) -> Self {
    FireNetBuilder {
      model_path: model_path.as_ref().to_path_buf(),
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  /// 加载并校验模型；任何失败都意味着服务不能启动
  pub fn build(self) -> Result<FireNet, FireNetError> {
    if !self.model_path.exists() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(FireNetError::ModelNotFound(self.model_path));
    }
    info!("加载模型文件: {}", self.model_path.display());

    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("构建 ONNX 推理计划");
    // tract 遇到部分畸形模型（如输入缺少类型）会直接 panic
    let plan = std::panic::catch_unwind(AssertUnwindSafe(|| compile_plan(&model_data)))
      .map_err(|payload| {
        let msg = panic_message(payload.as_ref());
        error!("解析模型时发生 panic: {}", msg);
        FireNetError::invalid("无法解析 ONNX 模型", anyhow::anyhow!("解析时发生 panic: {}", msg))
      })??;

    let model = FireNet { plan };

    // 用全零张量试跑一次，确认输出维度与标签数一致
    let output = model
      .infer(&ImageTensor::default())
      .map_err(|e| match e {
        FireNetError::TractError(e) => FireNetError::invalid("试运行失败", e),
        other => other,
      })?;
    if output.len() != ClassLabel::COUNT {
      error!(
        "预期模型输出数量为 {}, 实际为 {}",
        ClassLabel::COUNT,
        output.len()
      );
      return Err(FireNetError::invalid(
        "输出维度与标签数不一致",
        anyhow::anyhow!(
          "预期模型输出数量为 {}, 实际为 {}",
          ClassLabel::COUNT,
          output.len()
        ),
      ));
    }

    info!("模型加载完成");
    Ok(model)
  }
}

fn compile_plan(model_data: &[u8]) -> Result<TypedRunnableModel<TypedModel>, FireNetError> {
  let input_fact = f32::fact([1, INPUT_H as usize, INPUT_W as usize, 3]);
  tract_onnx::onnx()
    .model_for_read(&mut std::io::Cursor::new(model_data))
    .map_err(|e| FireNetError::invalid("无法解析 ONNX 模型", e))?
    .with_input_fact(0, input_fact.into())
    .map_err(|e| FireNetError::invalid("无法设置模型输入形状", e))?
    .into_optimized()
    .map_err(|e| FireNetError::invalid("无法优化模型", e))?
    .into_runnable()
    .map_err(|e| FireNetError::invalid("无法生成推理计划", e))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(msg) = payload.downcast_ref::<&str>() {
    msg.to_string()
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.clone()
  } else {
    "未知 panic".to_string()
  }
}

impl Model for FireNet {
  type Input = ImageTensor;
  type Output = Box<[f32]>;
  type Error = FireNetError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = Tensor::from_shape(&input.shape(), input.as_nhwc())?;

    debug!("执行模型推理");
    let outputs = self.plan.run(tvec!(tensor.into()))?;

    let output = outputs
      .first()
      .ok_or_else(|| anyhow::anyhow!("模型没有输出"))?
      .as_slice::<f32>()?;
    debug!("模型推理结果：{:?}", output);

    Ok(output.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::classify::interpret;
  use image::{Rgb, RgbImage};
  use prost::Message;
  use tract_onnx::pb::{
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorShapeProto,
    TypeProto, ValueInfoProto, attribute_proto::AttributeType, tensor_proto::DataType,
    tensor_shape_proto::{Dimension, dimension},
    type_proto,
  };

  fn ints(name: &str, values: &[i64]) -> AttributeProto {
    AttributeProto {
      name: name.to_string(),
      r#type: AttributeType::Ints as i32,
      ints: values.to_vec(),
      ..Default::default()
    }
  }

  fn int(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
      name: name.to_string(),
      r#type: AttributeType::Int as i32,
      i: value,
      ..Default::default()
    }
  }

  fn float_value(name: &str, shape: Option<&[i64]>) -> ValueInfoProto {
    let r#type = shape.map(|shape| TypeProto {
      value: Some(type_proto::Value::TensorType(type_proto::Tensor {
        elem_type: DataType::Float as i32,
        shape: Some(TensorShapeProto {
          dim: shape
            .iter()
            .map(|&d| Dimension {
              value: Some(dimension::Value::DimValue(d)),
              ..Default::default()
            })
            .collect(),
        }),
      })),
      ..Default::default()
    });

    ValueInfoProto {
      name: name.to_string(),
      r#type,
      ..Default::default()
    }
  }

  fn node(op_type: &str, input: &str, output: &str, attribute: Vec<AttributeProto>) -> NodeProto {
    NodeProto {
      input: vec![input.to_string()],
      output: vec![output.to_string()],
      name: output.to_string(),
      op_type: op_type.to_string(),
      attribute,
      ..Default::default()
    }
  }

  /// 按通道求均值的小模型：输出前 `classes` 个通道的均值，`classes` 取 2 或 3；
  /// `typed_input` 为 false 时输入不带类型信息
  fn channel_mean_model(classes: i64, typed_input: bool) -> Vec<u8> {
    let mut nodes = vec![node(
      "ReduceMean",
      "image",
      "mean",
      vec![ints("axes", &[1, 2]), int("keepdims", 0)],
    )];
    let output = if classes < 3 {
      nodes.push(node(
        "Slice",
        "mean",
        "scores",
        vec![ints("axes", &[1]), ints("starts", &[0]), ints("ends", &[classes])],
      ));
      "scores"
    } else {
      "mean"
    };

    let input_shape: &[i64] = &[1, 224, 224, 3];
    let model = ModelProto {
      ir_version: 4,
      opset_import: vec![OperatorSetIdProto {
        domain: String::new(),
        version: 9,
      }],
      graph: Some(GraphProto {
        node: nodes,
        name: "channel_mean".to_string(),
        input: vec![float_value("image", typed_input.then_some(input_shape))],
        output: vec![float_value(output, Some(&[1, classes][..]))],
        ..Default::default()
      }),
      ..Default::default()
    };
    model.encode_to_vec()
  }

  fn write_temp_model(tag: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
      "huojing-{}-{}.onnx",
      tag,
      std::process::id()
    ));
    std::fs::write(&path, bytes).unwrap();
    path
  }

  #[test]
  fn test_build_and_infer_two_class_model() {
    let path = write_temp_model("two-class", &channel_mean_model(2, true));
    let result = FireNetBuilder::new(&path).build();
    let _ = std::fs::remove_file(&path);
    let model = result.unwrap();

    let zero = model.infer(&ImageTensor::default()).unwrap();
    assert_eq!(zero.len(), 2);
    let prediction = interpret(&zero).unwrap();
    assert_eq!(prediction.predicted_class, ClassLabel::Fire);
    assert_eq!(prediction.confidence_str(), "0.00");

    let green = RgbImage::from_pixel(INPUT_W, INPUT_H, Rgb([0, 255, 0]));
    let output = model.infer(&ImageTensor::from(&green)).unwrap();
    let prediction = interpret(&output).unwrap();
    assert_eq!(prediction.predicted_class, ClassLabel::NonFire);
    assert_eq!(prediction.confidence_str(), "1.00");
  }

  #[test]
  fn test_build_rejects_three_class_model() {
    let path = write_temp_model("three-class", &channel_mean_model(3, true));
    let result = FireNetBuilder::new(&path).build();
    let _ = std::fs::remove_file(&path);

    match result {
      Err(FireNetError::ModelInvalid(msg, _)) => assert_eq!(msg, "输出维度与标签数不一致"),
      Err(other) => panic!("unexpected error: {other}"),
      Ok(_) => panic!("three class model should not load"),
    }
  }

  #[test]
  fn test_build_untyped_input_is_invalid_not_panic() {
    let path = write_temp_model("untyped", &channel_mean_model(2, false));
    let result = FireNetBuilder::new(&path).build();
    let _ = std::fs::remove_file(&path);

    assert!(matches!(result, Err(FireNetError::ModelInvalid(..))));
  }

  #[test]
  fn test_from_url_scheme() {
    let url = Url::parse("onnx:model/model_fire.onnx").unwrap();
    let builder = FireNetBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("model/model_fire.onnx"));

    let url = Url::parse("file:///srv/model_fire.onnx").unwrap();
    let builder = FireNetBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("/srv/model_fire.onnx"));
  }

  #[test]
  fn test_from_url_wrong_scheme() {
    let url = Url::parse("rknn:///srv/model_fire.rknn").unwrap();
    assert!(matches!(
      FireNetBuilder::from_url(&url),
      Err(FireNetError::ModelPathError(_))
    ));
  }

  #[test]
  fn test_build_missing_model() {
    let result = FireNetBuilder::new("/definitely/not/here/model_fire.onnx").build();
    match result {
      Err(FireNetError::ModelNotFound(path)) => {
        assert_eq!(path, Path::new("/definitely/not/here/model_fire.onnx"))
      }
      Err(other) => panic!("unexpected error: {other}"),
      Ok(_) => panic!("model should not load"),
    }
  }

  #[test]
  fn test_build_garbage_model() {
    let path = std::env::temp_dir().join(format!("huojing-garbage-{}.onnx", std::process::id()));
    std::fs::write(&path, b"this is not an onnx protobuf").unwrap();

    let result = FireNetBuilder::new(&path).build();
    let _ = std::fs::remove_file(&path);

    assert!(matches!(result, Err(FireNetError::ModelInvalid(..))));
  }
}
