// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/session.rs - 姿态分析会话
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

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  calibration::{CalibrationProgress, CalibrationState, Calibrator, Thresholds},
  classifier::{ModeError, PostureClassifier, PostureMode, Violation},
  config::SessionConfig,
  landmark::{JointAngles, LandmarkError, LandmarkFrame},
  notify::{AlertNotifier, NotificationSink},
  stats::{SessionStats, StatsAggregator},
};

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
  #[error("关键点数据错误: {0}")]
  Landmark(#[from] LandmarkError),
  #[error("{0}")]
  Mode(#[from] ModeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostureStatus {
  NoPerson,
  Calibrating { collected: usize, target: usize },
  Good,
  Poor,
}

impl fmt::Display for PostureStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PostureStatus::NoPerson => f.write_str("No Person Detected"),
      PostureStatus::Calibrating { collected, target } => {
        write!(f, "Calibrating {}/{}", collected, target)
      }
      PostureStatus::Good => f.write_str("Good Posture"),
      PostureStatus::Poor => f.write_str("Poor Posture"),
    }
  }
}

impl Serialize for PostureStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// 单帧判定结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
  pub timestamp_ms: u64,
  pub status: PostureStatus,
  pub violations: Vec<Violation>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub angles: Option<JointAngles>,
}

impl Verdict {
  pub fn label(&self) -> String {
    self.status.to_string()
  }

  pub fn is_poor(&self) -> bool {
    self.status == PostureStatus::Poor
  }
}

/// 一个独立的分析会话
///
/// 帧必须按顺序逐个送入；多个会话之间不共享任何状态，需要跨线程共享时由调用方加锁。
pub struct PostureSession {
  config: SessionConfig,
  mode: PostureMode,
  calibrator: Calibrator,
  classifier: PostureClassifier,
  stats: StatsAggregator,
  notifier: AlertNotifier,
  current: Option<Verdict>,
}

impl PostureSession {
  pub fn new(config: SessionConfig) -> Self {
    let notifier = AlertNotifier::new(config.cooldown);
    Self::with_notifier(config, notifier)
  }

  pub fn with_sink(config: SessionConfig, sink: impl NotificationSink + 'static) -> Self {
    let notifier = AlertNotifier::with_sink(config.cooldown, sink);
    Self::with_notifier(config, notifier)
  }

  fn with_notifier(config: SessionConfig, notifier: AlertNotifier) -> Self {
    Self {
      mode: config.initial_mode,
      calibrator: Calibrator::new(config.calibration),
      classifier: PostureClassifier::new(config.rules, config.threshold_policy),
      stats: StatsAggregator::new(),
      notifier,
      current: None,
      config,
    }
  }

  pub fn config(&self) -> &SessionConfig {
    &self.config
  }

  pub fn mode(&self) -> PostureMode {
    self.mode
  }

  /// 切换规则集，下一帧生效，不影响标定与统计
  pub fn set_mode(&mut self, mode: PostureMode) {
    if mode != self.mode {
      info!("姿态模式切换: {} -> {}", self.mode, mode);
    }
    self.mode = mode;
  }

  /// 解析失败时保持原模式不变
  pub fn set_mode_str(&mut self, mode: &str) -> Result<(), SessionError> {
    let mode: PostureMode = mode.parse()?;
    self.set_mode(mode);
    Ok(())
  }

  pub fn calibration_state(&self) -> &CalibrationState {
    self.calibrator.state()
  }

  pub fn thresholds(&self) -> Option<Thresholds> {
    self.calibrator.thresholds()
  }

  pub fn snapshot_stats(&self) -> SessionStats {
    self.stats.snapshot()
  }

  /// 最近一次检测到人体的判定结果
  pub fn current_status(&self) -> Option<&Verdict> {
    self.current.as_ref()
  }

  /// 重新标定；统计数据保留
  pub fn reset(&mut self) {
    self.calibrator.reset();
    self.current = None;
  }

  pub fn reset_stats(&mut self) {
    info!("清空会话统计");
    self.stats.reset();
  }

  pub fn process_frame_in(
    &mut self,
    frame: &LandmarkFrame,
    mode: PostureMode,
  ) -> Result<Verdict, SessionError> {
    self.set_mode(mode);
    self.process_frame(frame)
  }

  pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Result<Verdict, SessionError> {
    if !frame.detected {
      debug!("帧 {}ms 未检测到人体", frame.timestamp_ms);
      return Ok(Verdict {
        timestamp_ms: frame.timestamp_ms,
        status: PostureStatus::NoPerson,
        violations: Vec::new(),
        angles: None,
      });
    }

    let angles = JointAngles::measure(frame, self.classifier.rules().knee_margin_px)?;
    debug!(
      "帧 {}ms: 肩 {:.1}° 背 {:.1}° 颈 {:.1}° 膝过脚尖 {}",
      frame.timestamp_ms,
      angles.shoulder_tilt,
      angles.back_angle,
      angles.neck_angle,
      angles.knee_over_toe
    );

    let verdict = match self.calibrator.thresholds() {
      None => {
        let status = match self.calibrator.absorb(&angles) {
          CalibrationProgress::Collecting { collected, target } => {
            PostureStatus::Calibrating { collected, target }
          }
          CalibrationProgress::Completed(_) => {
            let target = self.calibrator.config().sample_target;
            PostureStatus::Calibrating {
              collected: target,
              target,
            }
          }
        };
        Verdict {
          timestamp_ms: frame.timestamp_ms,
          status,
          violations: Vec::new(),
          angles: Some(angles),
        }
      }
      Some(thresholds) => {
        let violations = self.classifier.classify(&angles, &thresholds, self.mode);
        self.stats.record(&violations);
        self
          .notifier
          .maybe_notify(&violations, Duration::from_millis(frame.timestamp_ms));
        let status = if violations.is_empty() {
          PostureStatus::Good
        } else {
          PostureStatus::Poor
        };
        Verdict {
          timestamp_ms: frame.timestamp_ms,
          status,
          violations,
          angles: Some(angles),
        }
      }
    };

    self.current = Some(verdict.clone());
    Ok(verdict)
  }
}
