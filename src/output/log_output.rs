// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  landmark::LandmarkFrame,
  output::Render,
  session::{PostureStatus, Verdict},
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// `log://`，加上 `?changes` 时只在状态变化时输出
pub struct LogOutput {
  changes_only: bool,
  last_label: Mutex<Option<String>>,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(LogOutput {
      changes_only: url.query_pairs().any(|(k, _)| k == "changes"),
      last_label: Mutex::new(None),
    })
  }
}

impl LogOutput {
  fn should_log(&self, verdict: &Verdict) -> bool {
    if !self.changes_only {
      return true;
    }
    let label = verdict.label();
    let mut last = self.last_label.lock().unwrap_or_else(PoisonError::into_inner);
    if last.as_deref() == Some(label.as_str()) {
      return false;
    }
    *last = Some(label);
    true
  }
}

impl Render<LandmarkFrame, Verdict> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &LandmarkFrame, result: &Verdict) -> Result<(), Self::Error> {
    if !self.should_log(result) {
      return Ok(());
    }

    match result.status {
      PostureStatus::Poor => {
        let names: Vec<&str> = result.violations.iter().map(|v| v.name()).collect();
        warn!("[{}ms] {}: {}", frame.timestamp_ms, result.status, names.join("; "));
      }
      _ => info!("[{}ms] {}", frame.timestamp_ms, result.status),
    }
    Ok(())
  }
}
