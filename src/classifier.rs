// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/classifier.rs - 姿态规则判定
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
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::{calibration::Thresholds, landmark::JointAngles};

pub const DEFAULT_NECK_LIMIT: f64 = 30.0;
pub const DEFAULT_BACK_LIMIT: f64 = 150.0;
pub const DEFAULT_KNEE_MARGIN_PX: f64 = 20.0;

#[derive(Error, Debug, PartialEq)]
pub enum ModeError {
  #[error("无效的姿态模式 '{0}'，可选 'sitting' 或 'squat'")]
  UnknownMode(String),
  #[error("无效的阈值策略 '{0}'，可选 'fixed' 或 'calibrated'")]
  UnknownPolicy(String),
}

/// 规则集选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostureMode {
  #[default]
  Sitting,
  Squat,
}

impl PostureMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      PostureMode::Sitting => "sitting",
      PostureMode::Squat => "squat",
    }
  }
}

impl FromStr for PostureMode {
  type Err = ModeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "sitting" => Ok(PostureMode::Sitting),
      "squat" => Ok(PostureMode::Squat),
      other => Err(ModeError::UnknownMode(other.to_string())),
    }
  }
}

impl fmt::Display for PostureMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 坐姿颈部规则使用的上限来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdPolicy {
  /// 固定使用 `RuleConfig::neck_limit`
  #[default]
  Fixed,
  /// 使用本次会话标定得到的颈部阈值
  Calibrated,
}

impl FromStr for ThresholdPolicy {
  type Err = ModeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "fixed" => Ok(ThresholdPolicy::Fixed),
      "calibrated" => Ok(ThresholdPolicy::Calibrated),
      other => Err(ModeError::UnknownPolicy(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Violation {
  NeckForward,
  BackNotStraight,
  KneeOverToe,
}

impl Violation {
  pub fn name(&self) -> &'static str {
    match self {
      Violation::NeckForward => "Neck bent forward (>30°)",
      Violation::BackNotStraight => "Back not straight (<150°)",
      Violation::KneeOverToe => "Knee over toe",
    }
  }
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl Serialize for Violation {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleConfig {
  pub neck_limit: f64,
  pub back_limit: f64,
  pub knee_margin_px: f64,
}

impl Default for RuleConfig {
  fn default() -> Self {
    Self {
      neck_limit: DEFAULT_NECK_LIMIT,
      back_limit: DEFAULT_BACK_LIMIT,
      knee_margin_px: DEFAULT_KNEE_MARGIN_PX,
    }
  }
}

/// 无状态的规则判定器，相同输入总是得到相同的违规列表
#[derive(Debug, Clone, Copy, Default)]
pub struct PostureClassifier {
  rules: RuleConfig,
  policy: ThresholdPolicy,
}

impl PostureClassifier {
  pub fn new(rules: RuleConfig, policy: ThresholdPolicy) -> Self {
    Self { rules, policy }
  }

  pub fn rules(&self) -> &RuleConfig {
    &self.rules
  }

  pub fn policy(&self) -> ThresholdPolicy {
    self.policy
  }

  fn neck_limit(&self, thresholds: &Thresholds) -> f64 {
    match self.policy {
      ThresholdPolicy::Fixed => self.rules.neck_limit,
      ThresholdPolicy::Calibrated => thresholds.neck,
    }
  }

  /// 按模式规则表依次判定，各规则相互独立，结果顺序即规则顺序
  pub fn classify(
    &self,
    angles: &JointAngles,
    thresholds: &Thresholds,
    mode: PostureMode,
  ) -> Vec<Violation> {
    let mut violations = Vec::with_capacity(2);
    let back_bent = angles.back_angle < self.rules.back_limit;

    match mode {
      PostureMode::Sitting => {
        if angles.neck_angle > self.neck_limit(thresholds) {
          violations.push(Violation::NeckForward);
        }
        if back_bent {
          violations.push(Violation::BackNotStraight);
        }
      }
      PostureMode::Squat => {
        if back_bent {
          violations.push(Violation::BackNotStraight);
        }
        if angles.knee_over_toe {
          violations.push(Violation::KneeOverToe);
        }
      }
    }

    violations
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const THRESHOLDS: Thresholds = Thresholds {
    shoulder: 80.0,
    neck: 15.0,
  };

  fn angles(back_angle: f64, neck_angle: f64, knee_over_toe: bool) -> JointAngles {
    JointAngles {
      shoulder_tilt: 90.0,
      back_angle,
      neck_angle,
      knee_over_toe,
    }
  }

  #[test]
  fn sitting_reports_neck_then_back() {
    let classifier = PostureClassifier::default();
    let violations = classifier.classify(&angles(140.0, 40.0, false), &THRESHOLDS, PostureMode::Sitting);
    assert_eq!(violations, vec![Violation::NeckForward, Violation::BackNotStraight]);
    let names: Vec<_> = violations.iter().map(Violation::name).collect();
    assert_eq!(names, ["Neck bent forward (>30°)", "Back not straight (<150°)"]);
  }

  #[test]
  fn sitting_good_posture_is_empty() {
    let classifier = PostureClassifier::default();
    assert!(
      classifier
        .classify(&angles(160.0, 10.0, true), &THRESHOLDS, PostureMode::Sitting)
        .is_empty()
    );
  }

  #[test]
  fn squat_ignores_neck_and_checks_knee() {
    let classifier = PostureClassifier::default();
    assert_eq!(
      classifier.classify(&angles(140.0, 80.0, true), &THRESHOLDS, PostureMode::Squat),
      vec![Violation::BackNotStraight, Violation::KneeOverToe]
    );
    assert_eq!(
      classifier.classify(&angles(170.0, 80.0, true), &THRESHOLDS, PostureMode::Squat),
      vec![Violation::KneeOverToe]
    );
    assert!(
      classifier
        .classify(&angles(170.0, 80.0, false), &THRESHOLDS, PostureMode::Squat)
        .is_empty()
    );
  }

  #[test]
  fn limits_are_strict() {
    let classifier = PostureClassifier::default();
    assert!(
      classifier
        .classify(&angles(150.0, 30.0, false), &THRESHOLDS, PostureMode::Sitting)
        .is_empty()
    );
  }

  #[test]
  fn calibrated_policy_uses_session_neck_threshold() {
    let classifier = PostureClassifier::new(RuleConfig::default(), ThresholdPolicy::Calibrated);
    assert_eq!(
      classifier.classify(&angles(170.0, 20.0, false), &THRESHOLDS, PostureMode::Sitting),
      vec![Violation::NeckForward]
    );
    let fixed = PostureClassifier::default();
    assert!(
      fixed
        .classify(&angles(170.0, 20.0, false), &THRESHOLDS, PostureMode::Sitting)
        .is_empty()
    );
  }

  #[test]
  fn mode_parsing_rejects_unknown() {
    assert_eq!("squat".parse::<PostureMode>(), Ok(PostureMode::Squat));
    assert_eq!("sitting".parse::<PostureMode>(), Ok(PostureMode::Sitting));
    assert_eq!(
      "standing".parse::<PostureMode>(),
      Err(ModeError::UnknownMode("standing".to_string()))
    );
    assert_eq!("calibrated".parse::<ThresholdPolicy>(), Ok(ThresholdPolicy::Calibrated));
    assert!("adaptive".parse::<ThresholdPolicy>().is_err());
  }

  #[test]
  fn violation_serializes_as_name() {
    let json = serde_json::to_string(&vec![Violation::KneeOverToe]).unwrap();
    assert_eq!(json, r#"["Knee over toe"]"#);
  }
}
