// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{Datelike, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  landmark::LandmarkFrame,
  output::Render,
  session::Verdict,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// `folder:///dir`，按 年/月/日 目录保存不良姿态帧的关键点与判定
///
/// 加上 `?always` 时所有帧都会记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counters: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counters: Mutex::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.json",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<LandmarkFrame, Verdict> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &LandmarkFrame, result: &Verdict) -> Result<(), Self::Error> {
    if !self.always && !result.is_poor() {
      return Ok(());
    }

    let joints: BTreeMap<&str, [f64; 2]> = frame
      .joints()
      .map(|(joint, point)| (joint.name(), [point.x, point.y]))
      .collect();
    let record = json!({
      "verdict": result,
      "joints": joints,
    });

    let path = self.frame_path()?;
    debug!("记录帧到 {}", path.display());
    std::fs::write(&path, serde_json::to_vec_pretty(&record)?)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{classifier::Violation, landmark::Joint, session::PostureStatus};

  fn collect_files(dir: &std::path::Path, out: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        collect_files(&path, out);
      } else {
        out.push(path);
      }
    }
  }

  #[test]
  fn records_only_poor_frames_by_default() {
    let root = std::env::temp_dir().join(format!("duanzuo-folder-{}", std::process::id()));
    let url = url::Url::parse(&format!("folder://{}", root.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let frame = LandmarkFrame::new(10).with_joint(Joint::LeftEar, (1.0, 2.0));
    let good = Verdict {
      timestamp_ms: 10,
      status: PostureStatus::Good,
      violations: vec![],
      angles: None,
    };
    let poor = Verdict {
      status: PostureStatus::Poor,
      violations: vec![Violation::BackNotStraight],
      ..good.clone()
    };
    output.render_result(&frame, &good).unwrap();
    output.render_result(&frame, &poor).unwrap();

    let mut files = Vec::new();
    collect_files(&root, &mut files);
    assert_eq!(files.len(), 1);

    let record: serde_json::Value =
      serde_json::from_slice(&std::fs::read(&files[0]).unwrap()).unwrap();
    assert_eq!(record["verdict"]["status"], "Poor Posture");
    assert_eq!(record["verdict"]["violations"][0], "Back not straight (<150°)");
    assert_eq!(record["joints"]["left_ear"][1], 2.0);
    let _ = std::fs::remove_dir_all(&root);
  }
}
