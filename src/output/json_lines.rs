// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/output/json_lines.rs - JSON Lines 文件输出
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

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, landmark::LandmarkFrame, output::Render, session::Verdict};

#[derive(Error, Debug)]
pub enum JsonLinesOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// `jsonl:///path/to/verdicts.jsonl`，每帧一行判定结果
pub struct JsonLinesOutput {
  path: String,
  writer: Mutex<BufWriter<File>>,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonLinesOutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let path = url.path().to_string();
    if let Some(parent) = Path::new(&path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    info!("判定结果写入: {}", path);
    let file = File::create(&path)?;
    Ok(JsonLinesOutput {
      path,
      writer: Mutex::new(BufWriter::new(file)),
    })
  }
}

impl JsonLinesOutput {
  pub fn path(&self) -> &str {
    &self.path
  }
}

impl Render<LandmarkFrame, Verdict> for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn render_result(&self, _frame: &LandmarkFrame, result: &Verdict) -> Result<(), Self::Error> {
    let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
    serde_json::to_writer(&mut *writer, result)?;
    writer.write_all(b"\n")?;
    Ok(())
  }

  fn finish(&self) -> Result<(), Self::Error> {
    self
      .writer
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .flush()?;
    Ok(())
  }
}
