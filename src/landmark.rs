// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/landmark.rs - 姿态关键点帧与关节角度
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
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point, tilt_from_vertical, vertex_angle};

/// 姿态分析所用的关键点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
  LeftShoulder,
  RightShoulder,
  LeftHip,
  RightHip,
  LeftKnee,
  LeftAnkle,
  LeftEar,
}

impl Joint {
  pub const ALL: [Joint; 7] = [
    Joint::LeftShoulder,
    Joint::RightShoulder,
    Joint::LeftHip,
    Joint::RightHip,
    Joint::LeftKnee,
    Joint::LeftAnkle,
    Joint::LeftEar,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Joint::LeftShoulder => "left_shoulder",
      Joint::RightShoulder => "right_shoulder",
      Joint::LeftHip => "left_hip",
      Joint::RightHip => "right_hip",
      Joint::LeftKnee => "left_knee",
      Joint::LeftAnkle => "left_ankle",
      Joint::LeftEar => "left_ear",
    }
  }
}

impl fmt::Display for Joint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum LandmarkError {
  #[error("缺少关键点: {0}")]
  MissingJoint(Joint),
  #[error("关键点坐标无效: {0}")]
  NonFinite(Joint),
  #[error("帧尺寸无效: {0}x{1}")]
  InvalidDimensions(u32, u32),
}

/// 单帧的关键点集合（像素坐标）
///
/// `detected` 为 false 时表示该帧未检测到人体，此时关键点可以为空。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LandmarkFrame {
  pub timestamp_ms: u64,
  pub detected: bool,
  joints: BTreeMap<Joint, Point>,
}

impl LandmarkFrame {
  pub fn new(timestamp_ms: u64) -> Self {
    Self {
      timestamp_ms,
      detected: true,
      joints: BTreeMap::new(),
    }
  }

  pub fn no_person(timestamp_ms: u64) -> Self {
    Self {
      timestamp_ms,
      detected: false,
      joints: BTreeMap::new(),
    }
  }

  pub fn with_joint(mut self, joint: Joint, point: impl Into<Point>) -> Self {
    self.joints.insert(joint, point.into());
    self
  }

  /// 将姿态估计器输出的归一化坐标按帧尺寸换算为像素坐标
  pub fn from_normalized(
    timestamp_ms: u64,
    landmarks: &BTreeMap<Joint, (f64, f64)>,
    width: u32,
    height: u32,
  ) -> Result<Self, LandmarkError> {
    if width == 0 || height == 0 {
      return Err(LandmarkError::InvalidDimensions(width, height));
    }

    let joints = landmarks
      .iter()
      .map(|(&joint, &(x, y))| (joint, Point::new(x * width as f64, y * height as f64)))
      .collect();

    Ok(Self {
      timestamp_ms,
      detected: !landmarks.is_empty(),
      joints,
    })
  }

  pub fn joint(&self, joint: Joint) -> Result<Point, LandmarkError> {
    let point = self
      .joints
      .get(&joint)
      .copied()
      .ok_or(LandmarkError::MissingJoint(joint))?;
    if !point.x.is_finite() || !point.y.is_finite() {
      return Err(LandmarkError::NonFinite(joint));
    }
    Ok(point)
  }

  pub fn joints(&self) -> impl Iterator<Item = (Joint, Point)> + '_ {
    self.joints.iter().map(|(&j, &p)| (j, p))
  }
}

/// 由单帧关键点推导出的关节角度，每帧重新计算
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointAngles {
  /// 左肩相对双肩中点的竖直夹角，双肩水平时约为 90°
  pub shoulder_tilt: f64,
  /// 肩-髋-膝夹角
  pub back_angle: f64,
  /// 耳-肩连线与竖直方向的夹角
  pub neck_angle: f64,
  pub knee_over_toe: bool,
}

impl JointAngles {
  /// `knee_margin_px` 为膝盖超过脚尖的水平像素容差
  pub fn measure(frame: &LandmarkFrame, knee_margin_px: f64) -> Result<Self, LandmarkError> {
    let l_shoulder = frame.joint(Joint::LeftShoulder)?;
    let r_shoulder = frame.joint(Joint::RightShoulder)?;
    let l_hip = frame.joint(Joint::LeftHip)?;
    let l_knee = frame.joint(Joint::LeftKnee)?;
    let l_ankle = frame.joint(Joint::LeftAnkle)?;
    let l_ear = frame.joint(Joint::LeftEar)?;

    let mid_shoulder = l_shoulder.midpoint(r_shoulder);

    Ok(Self {
      shoulder_tilt: tilt_from_vertical(l_shoulder - mid_shoulder),
      back_angle: vertex_angle(l_shoulder, l_hip, l_knee),
      neck_angle: tilt_from_vertical(l_ear - l_shoulder),
      knee_over_toe: (l_knee.x - l_ankle.x).abs() > knee_margin_px && l_knee.y > l_ankle.y,
    })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  /// 直立坐姿：肩水平、背部伸直、头部竖直
  pub(crate) fn upright_frame(timestamp_ms: u64) -> LandmarkFrame {
    LandmarkFrame::new(timestamp_ms)
      .with_joint(Joint::LeftShoulder, (100.0, 100.0))
      .with_joint(Joint::RightShoulder, (160.0, 100.0))
      .with_joint(Joint::LeftEar, (100.0, 50.0))
      .with_joint(Joint::LeftHip, (100.0, 250.0))
      .with_joint(Joint::RightHip, (160.0, 250.0))
      .with_joint(Joint::LeftKnee, (100.0, 400.0))
      .with_joint(Joint::LeftAnkle, (100.0, 550.0))
  }

  #[test]
  fn upright_frame_measures_straight() {
    let angles = JointAngles::measure(&upright_frame(0), 20.0).unwrap();
    assert!((angles.shoulder_tilt - 90.0).abs() < 1e-3);
    assert!((angles.back_angle - 180.0).abs() < 0.1);
    assert!(angles.neck_angle < 0.1);
    assert!(!angles.knee_over_toe);
  }

  #[test]
  fn forward_head_increases_neck_angle() {
    let frame = upright_frame(0).with_joint(Joint::LeftEar, (150.0, 50.0));
    let angles = JointAngles::measure(&frame, 20.0).unwrap();
    assert!((angles.neck_angle - 45.0).abs() < 1e-3);
  }

  #[test]
  fn knee_over_toe_needs_offset_and_lower_knee() {
    let frame = upright_frame(0)
      .with_joint(Joint::LeftKnee, (100.0, 300.0))
      .with_joint(Joint::LeftAnkle, (70.0, 280.0));
    assert!(JointAngles::measure(&frame, 20.0).unwrap().knee_over_toe);

    let frame = frame.with_joint(Joint::LeftAnkle, (95.0, 280.0));
    assert!(!JointAngles::measure(&frame, 20.0).unwrap().knee_over_toe);

    let frame = frame.with_joint(Joint::LeftAnkle, (70.0, 320.0));
    assert!(!JointAngles::measure(&frame, 20.0).unwrap().knee_over_toe);
  }

  #[test]
  fn missing_joint_is_reported() {
    let frame = LandmarkFrame::new(0).with_joint(Joint::LeftShoulder, (1.0, 1.0));
    assert_eq!(
      JointAngles::measure(&frame, 20.0),
      Err(LandmarkError::MissingJoint(Joint::RightShoulder))
    );
  }

  #[test]
  fn non_finite_joint_is_reported() {
    let frame = upright_frame(0).with_joint(Joint::LeftEar, (f64::NAN, 2.0));
    assert_eq!(
      JointAngles::measure(&frame, 20.0),
      Err(LandmarkError::NonFinite(Joint::LeftEar))
    );
  }

  #[test]
  fn normalized_coordinates_scale_to_pixels() {
    let mut landmarks = BTreeMap::new();
    landmarks.insert(Joint::LeftEar, (0.5, 0.25));
    let frame = LandmarkFrame::from_normalized(7, &landmarks, 640, 480).unwrap();
    assert!(frame.detected);
    assert_eq!(frame.timestamp_ms, 7);
    assert_eq!(frame.joint(Joint::LeftEar).unwrap(), Point::new(320.0, 120.0));

    let empty = LandmarkFrame::from_normalized(8, &BTreeMap::new(), 640, 480).unwrap();
    assert!(!empty.detected);

    assert_eq!(
      LandmarkFrame::from_normalized(9, &landmarks, 0, 480),
      Err(LandmarkError::InvalidDimensions(0, 480))
    );
  }
}
