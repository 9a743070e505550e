// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/output.rs - 判定结果输出
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, landmark::LandmarkFrame, session::Verdict};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;

  /// 输入结束后调用，用于刷新缓冲
  fn finish(&self) -> Result<(), Self::Error> {
    Ok(())
  }
}

mod log_output;
pub use self::log_output::{LogOutput, LogOutputError};

mod json_lines;
pub use self::json_lines::{JsonLinesOutput, JsonLinesOutputError};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("日志输出错误: {0}")]
  LogOutputError(#[from] LogOutputError),
  #[error("JSON Lines 输出错误: {0}")]
  JsonLinesOutputError(#[from] JsonLinesOutputError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  LogOutput(LogOutput),
  JsonLinesOutput(JsonLinesOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::LogOutput(LogOutput::from_url(url)?)),
      JsonLinesOutput::SCHEME => Ok(OutputWrapper::JsonLinesOutput(JsonLinesOutput::from_url(
        url,
      )?)),
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => Ok(OutputWrapper::DirectoryRecordOutput(
        DirectoryRecordOutput::from_url(url)?,
      )),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<LandmarkFrame, Verdict> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &LandmarkFrame, result: &Verdict) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::LogOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::JsonLinesOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }

  fn finish(&self) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::LogOutput(output) => output.finish().map_err(OutputError::from),
      OutputWrapper::JsonLinesOutput(output) => output.finish().map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output.finish().map_err(OutputError::from),
    }
  }
}
