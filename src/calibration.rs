// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/calibration.rs - 基线标定状态机
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
use tracing::{debug, info};

use crate::landmark::JointAngles;

pub const DEFAULT_SAMPLE_TARGET: usize = 30;
pub const DEFAULT_SHOULDER_OFFSET: f64 = 10.0;
pub const DEFAULT_NECK_OFFSET: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
  /// 标定所需的基线样本帧数
  pub sample_target: usize,
  /// 肩部阈值 = 基线均值 - 偏移
  pub shoulder_offset: f64,
  /// 颈部阈值 = 基线均值 + 偏移
  pub neck_offset: f64,
}

impl Default for CalibrationConfig {
  fn default() -> Self {
    Self {
      sample_target: DEFAULT_SAMPLE_TARGET,
      shoulder_offset: DEFAULT_SHOULDER_OFFSET,
      neck_offset: DEFAULT_NECK_OFFSET,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
  pub shoulder: f64,
  pub neck: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CalibrationState {
  #[default]
  Idle,
  Collecting {
    shoulder_samples: Vec<f64>,
    neck_samples: Vec<f64>,
  },
  Calibrated(Thresholds),
}

impl CalibrationState {
  pub fn collected(&self) -> usize {
    match self {
      CalibrationState::Idle => 0,
      CalibrationState::Collecting {
        shoulder_samples, ..
      } => shoulder_samples.len(),
      CalibrationState::Calibrated(_) => 0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationProgress {
  Collecting { collected: usize, target: usize },
  Completed(Thresholds),
}

#[derive(Debug, Clone)]
pub struct Calibrator {
  config: CalibrationConfig,
  state: CalibrationState,
}

impl Calibrator {
  pub fn new(config: CalibrationConfig) -> Self {
    Self {
      config: CalibrationConfig {
        sample_target: config.sample_target.max(1),
        ..config
      },
      state: CalibrationState::Idle,
    }
  }

  pub fn config(&self) -> &CalibrationConfig {
    &self.config
  }

  pub fn state(&self) -> &CalibrationState {
    &self.state
  }

  pub fn thresholds(&self) -> Option<Thresholds> {
    match self.state {
      CalibrationState::Calibrated(thresholds) => Some(thresholds),
      _ => None,
    }
  }

  pub fn is_calibrated(&self) -> bool {
    self.thresholds().is_some()
  }

  /// 吸收一帧基线样本
  ///
  /// 第 `sample_target` 个样本到达时立即完成标定；完成标定的这一帧不参与分类。
  /// 已标定时不修改状态，直接返回现有阈值。
  pub fn absorb(&mut self, angles: &JointAngles) -> CalibrationProgress {
    let target = self.config.sample_target;

    let (mut shoulder_samples, mut neck_samples) = match std::mem::take(&mut self.state) {
      CalibrationState::Calibrated(thresholds) => {
        self.state = CalibrationState::Calibrated(thresholds);
        return CalibrationProgress::Completed(thresholds);
      }
      CalibrationState::Idle => {
        info!("开始采集标定样本，目标 {} 帧", target);
        (Vec::with_capacity(target), Vec::with_capacity(target))
      }
      CalibrationState::Collecting {
        shoulder_samples,
        neck_samples,
      } => (shoulder_samples, neck_samples),
    };

    shoulder_samples.push(angles.shoulder_tilt);
    neck_samples.push(angles.neck_angle);
    let collected = shoulder_samples.len();
    debug!("标定样本 {}/{}", collected, target);

    if collected < target {
      self.state = CalibrationState::Collecting {
        shoulder_samples,
        neck_samples,
      };
      return CalibrationProgress::Collecting { collected, target };
    }

    let thresholds = Thresholds {
      shoulder: mean(&shoulder_samples) - self.config.shoulder_offset,
      neck: mean(&neck_samples) + self.config.neck_offset,
    };
    info!(
      "标定完成，肩部阈值 < {:.1}°，颈部阈值 < {:.1}°",
      thresholds.shoulder, thresholds.neck
    );
    self.state = CalibrationState::Calibrated(thresholds);
    CalibrationProgress::Completed(thresholds)
  }

  /// 丢弃基线与阈值，下一帧重新开始采集
  pub fn reset(&mut self) {
    if !matches!(self.state, CalibrationState::Idle) {
      info!("重置标定状态");
    }
    self.state = CalibrationState::Idle;
  }
}

fn mean(samples: &[f64]) -> f64 {
  if samples.is_empty() {
    return 0.0;
  }
  samples.iter().sum::<f64>() / samples.len() as f64
}
