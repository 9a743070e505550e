// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/input.rs - 关键点帧输入
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

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Stdin, StdinLock};

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  landmark::{Joint, LandmarkError, LandmarkFrame},
};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("第 {line} 行 JSON 解析错误: {source}")]
  ParseError {
    line: usize,
    source: serde_json::Error,
  },
  #[error("第 {line} 行关键点错误: {source}")]
  LandmarkError { line: usize, source: LandmarkError },
}

/// 姿态估计器输出的一行记录
///
/// 给出 `width`/`height` 时坐标视为归一化坐标，否则视为像素坐标。
#[derive(Debug, Clone, Deserialize)]
pub struct LandmarkRecord {
  pub timestamp_ms: u64,
  #[serde(default = "detected_by_default")]
  pub detected: bool,
  #[serde(default)]
  pub width: Option<u32>,
  #[serde(default)]
  pub height: Option<u32>,
  #[serde(default)]
  pub landmarks: BTreeMap<Joint, (f64, f64)>,
}

fn detected_by_default() -> bool {
  true
}

impl LandmarkRecord {
  pub fn into_frame(self) -> Result<LandmarkFrame, LandmarkError> {
    if !self.detected || self.landmarks.is_empty() {
      return Ok(LandmarkFrame::no_person(self.timestamp_ms));
    }

    match (self.width, self.height) {
      (None, None) => Ok(
        self
          .landmarks
          .into_iter()
          .fold(LandmarkFrame::new(self.timestamp_ms), |frame, (joint, point)| {
            frame.with_joint(joint, point)
          }),
      ),
      (width, height) => LandmarkFrame::from_normalized(
        self.timestamp_ms,
        &self.landmarks,
        width.unwrap_or(0),
        height.unwrap_or(0),
      ),
    }
  }
}

/// 从 JSON Lines 流中逐行读取关键点帧，空行跳过
pub struct LandmarkReader<R> {
  reader: R,
  line: usize,
  buffer: String,
}

impl<R: BufRead> LandmarkReader<R> {
  pub fn new(reader: R) -> Self {
    Self {
      reader,
      line: 0,
      buffer: String::new(),
    }
  }

  fn parse_line(&self) -> Result<LandmarkFrame, InputError> {
    let line = self.line;
    let record: LandmarkRecord = serde_json::from_str(self.buffer.trim())
      .map_err(|source| InputError::ParseError { line, source })?;
    record
      .into_frame()
      .map_err(|source| InputError::LandmarkError { line, source })
  }
}

impl<R: BufRead> Iterator for LandmarkReader<R> {
  type Item = Result<LandmarkFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      self.buffer.clear();
      match self.reader.read_line(&mut self.buffer) {
        Ok(0) => return None,
        Ok(_) => {
          self.line += 1;
          if self.buffer.trim().is_empty() {
            continue;
          }
          let result = self.parse_line();
          if let Err(e) = &result {
            error!("读取关键点帧失败: {}", e);
          }
          return Some(result);
        }
        Err(e) => return Some(Err(InputError::IoError(e))),
      }
    }
  }
}

/// `landmarks:///path/to/frames.jsonl`
pub struct LandmarkFileInput {
  reader: LandmarkReader<BufReader<File>>,
}

impl FromUrlWithScheme for LandmarkFileInput {
  const SCHEME: &'static str = "landmarks";
}

impl FromUrl for LandmarkFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    info!("打开关键点文件: {}", url.path());
    let file = File::open(url.path())?;
    Ok(Self {
      reader: LandmarkReader::new(BufReader::new(file)),
    })
  }
}

impl Iterator for LandmarkFileInput {
  type Item = Result<LandmarkFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.reader.next()
  }
}

/// `stdin://`，由上游姿态估计进程通过管道送入
pub struct StdinInput {
  reader: LandmarkReader<StdinLock<'static>>,
}

impl FromUrlWithScheme for StdinInput {
  const SCHEME: &'static str = "stdin";
}

impl FromUrl for StdinInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let stdin: Stdin = std::io::stdin();
    Ok(Self {
      reader: LandmarkReader::new(stdin.lock()),
    })
  }
}

impl Iterator for StdinInput {
  type Item = Result<LandmarkFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.reader.next()
  }
}

pub enum InputWrapper {
  LandmarkFile(LandmarkFileInput),
  Stdin(StdinInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LandmarkFileInput::SCHEME => Ok(InputWrapper::LandmarkFile(LandmarkFileInput::from_url(url)?)),
      StdinInput::SCHEME => Ok(InputWrapper::Stdin(StdinInput::from_url(url)?)),
      other => Err(InputError::SchemeMismatch(format!("不支持的输入方案 '{}'", other))),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Result<LandmarkFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::LandmarkFile(input) => input.next(),
      InputWrapper::Stdin(input) => input.next(),
    }
  }
}
