// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/config.rs - 会话配置
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

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  calibration::CalibrationConfig,
  classifier::{ModeError, PostureMode, RuleConfig, ThresholdPolicy},
  notify::DEFAULT_COOLDOWN,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("未知配置项: {0}")]
  UnknownKey(String),
  #[error("配置项 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
  #[error("{0}")]
  Mode(#[from] ModeError),
}

/// 单个会话的全部策略参数，默认值即常用的坐姿参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
  pub calibration: CalibrationConfig,
  pub rules: RuleConfig,
  pub threshold_policy: ThresholdPolicy,
  pub cooldown: Duration,
  pub initial_mode: PostureMode,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      calibration: CalibrationConfig::default(),
      rules: RuleConfig::default(),
      threshold_policy: ThresholdPolicy::default(),
      cooldown: DEFAULT_COOLDOWN,
      initial_mode: PostureMode::default(),
    }
  }
}

impl SessionConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_mode(mut self, mode: PostureMode) -> Self {
    self.initial_mode = mode;
    self
  }

  pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
    self.cooldown = cooldown;
    self
  }

  pub fn with_policy(mut self, policy: ThresholdPolicy) -> Self {
    self.threshold_policy = policy;
    self
  }

  pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
    self.calibration = calibration;
    self
  }

  pub fn with_rules(mut self, rules: RuleConfig) -> Self {
    self.rules = rules;
    self
  }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

fn parse_finite(key: &str, value: &str) -> Result<f64, ConfigError> {
  let parsed: f64 = parse_value(key, value)?;
  if !parsed.is_finite() {
    return Err(ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    });
  }
  Ok(parsed)
}

impl FromUrlWithScheme for SessionConfig {
  const SCHEME: &'static str = "posture";
}

impl FromUrl for SessionConfig {
  type Error = ConfigError;

  /// 例如 `posture://?mode=squat&samples=30&cooldown=10&policy=calibrated`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ConfigError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        actual: url.scheme().to_string(),
      });
    }

    let mut config = SessionConfig::new();
    for (key, value) in url.query_pairs() {
      debug!("配置项 {} = {}", key, value);
      match &*key {
        "mode" => config.initial_mode = value.parse()?,
        "policy" => config.threshold_policy = value.parse()?,
        "samples" => {
          let samples: usize = parse_value(&key, &value)?;
          if samples == 0 {
            return Err(ConfigError::InvalidValue {
              key: key.to_string(),
              value: value.to_string(),
            });
          }
          config.calibration.sample_target = samples;
        }
        "shoulder_offset" => config.calibration.shoulder_offset = parse_finite(&key, &value)?,
        "neck_offset" => config.calibration.neck_offset = parse_finite(&key, &value)?,
        "neck_limit" => config.rules.neck_limit = parse_finite(&key, &value)?,
        "back_limit" => config.rules.back_limit = parse_finite(&key, &value)?,
        "knee_margin" => config.rules.knee_margin_px = parse_finite(&key, &value)?,
        "cooldown" => {
          let seconds = parse_finite(&key, &value)?;
          config.cooldown =
            Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidValue {
              key: key.to_string(),
              value: value.to_string(),
            })?;
        }
        other => return Err(ConfigError::UnknownKey(other.to_string())),
      }
    }

    Ok(config)
  }
}
