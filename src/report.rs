// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/report.rs - 批量处理报告
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

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::{
  calibration::Thresholds,
  classifier::{PostureMode, Violation},
  session::{PostureSession, PostureStatus, Verdict},
  stats::SessionStats,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameFeedback {
  pub frame: usize,
  pub timestamp_ms: u64,
  pub status: PostureStatus,
  pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
  pub generated_at: String,
  pub mode: PostureMode,
  pub thresholds: Option<Thresholds>,
  pub summary: SessionStats,
  pub frame_feedback: Vec<FrameFeedback>,
}

impl SessionReport {
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, self.to_json()?)?;
    Ok(())
  }
}

/// 逐帧收集反馈，结束时结合会话统计生成报告
#[derive(Debug, Default)]
pub struct ReportBuilder {
  frame_feedback: Vec<FrameFeedback>,
}

impl ReportBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, verdict: &Verdict) {
    self.frame_feedback.push(FrameFeedback {
      frame: self.frame_feedback.len(),
      timestamp_ms: verdict.timestamp_ms,
      status: verdict.status,
      violations: verdict.violations.clone(),
    });
  }

  pub fn build(self, session: &PostureSession) -> SessionReport {
    SessionReport {
      generated_at: Utc::now().to_rfc3339(),
      mode: session.mode(),
      thresholds: session.thresholds(),
      summary: session.snapshot_stats(),
      frame_feedback: self.frame_feedback,
    }
  }
}
