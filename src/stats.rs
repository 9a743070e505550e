// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/stats.rs - 会话统计
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

use serde::Serialize;

use crate::classifier::Violation;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
  pub total_frames: u64,
  pub bad_posture_frames: u64,
  pub violation_counts: BTreeMap<String, u64>,
}

impl SessionStats {
  pub fn bad_posture_ratio(&self) -> f64 {
    if self.total_frames == 0 {
      0.0
    } else {
      self.bad_posture_frames as f64 / self.total_frames as f64
    }
  }
}

/// 只增不减的计数器，仅在显式 `reset` 时清零
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
  stats: SessionStats,
}

impl StatsAggregator {
  pub fn new() -> Self {
    Self::default()
  }

  /// 记录一帧的判定结果，违规按列表元素逐个计数
  pub fn record(&mut self, violations: &[Violation]) {
    self.stats.total_frames += 1;
    if violations.is_empty() {
      return;
    }

    self.stats.bad_posture_frames += 1;
    for violation in violations {
      *self
        .stats
        .violation_counts
        .entry(violation.name().to_string())
        .or_insert(0) += 1;
    }
  }

  pub fn snapshot(&self) -> SessionStats {
    self.stats.clone()
  }

  pub fn reset(&mut self) {
    self.stats = SessionStats::default();
  }
}
