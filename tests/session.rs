// 该文件是 Duanzuo （端坐） 项目的一部分。
// tests/session.rs - 会话端到端测试
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

use duanzuo::{
  Joint, LandmarkFrame, PostureMode, PostureSession, PostureStatus, SessionConfig, Violation,
  calibration::{CalibrationState, Thresholds},
  notify::{MemorySink, NotificationKind},
};

const FRAME_MS: u64 = 100;

/// 直立坐姿，肩部夹角 90°，颈部 0°，背部 180°
fn upright(index: u64) -> LandmarkFrame {
  LandmarkFrame::new(index * FRAME_MS)
    .with_joint(Joint::LeftShoulder, (100.0, 100.0))
    .with_joint(Joint::RightShoulder, (160.0, 100.0))
    .with_joint(Joint::LeftEar, (100.0, 50.0))
    .with_joint(Joint::LeftHip, (100.0, 250.0))
    .with_joint(Joint::RightHip, (160.0, 250.0))
    .with_joint(Joint::LeftKnee, (100.0, 400.0))
    .with_joint(Joint::LeftAnkle, (100.0, 550.0))
}

/// 颈部前倾 45°，背部 135°
fn hunched(index: u64) -> LandmarkFrame {
  upright(index)
    .with_joint(Joint::LeftEar, (150.0, 50.0))
    .with_joint(Joint::LeftKnee, (200.0, 350.0))
}

/// 深蹲：背部 135°，膝盖越过脚尖
fn deep_squat(index: u64) -> LandmarkFrame {
  upright(index)
    .with_joint(Joint::LeftKnee, (200.0, 350.0))
    .with_joint(Joint::LeftAnkle, (170.0, 330.0))
}

fn calibrated(sink: MemorySink) -> PostureSession {
  let mut session = PostureSession::with_sink(SessionConfig::new(), sink);
  for i in 0..30 {
    session.process_frame(&upright(i)).unwrap();
  }
  session
}

#[test]
fn thirty_frames_calibrate_and_thirty_first_is_classified() {
  let mut session = PostureSession::with_sink(SessionConfig::new(), MemorySink::new());
  for i in 0..30 {
    let verdict = session.process_frame(&upright(i)).unwrap();
    assert_eq!(verdict.label(), format!("Calibrating {}/30", i + 1));
  }

  let Thresholds { shoulder, neck } = match session.calibration_state() {
    CalibrationState::Calibrated(thresholds) => *thresholds,
    other => panic!("未完成标定: {:?}", other),
  };
  assert!((shoulder - 80.0).abs() < 1e-6);
  assert!((neck - 5.0).abs() < 0.1);
  assert_eq!(session.snapshot_stats().total_frames, 0);

  let verdict = session.process_frame(&upright(30)).unwrap();
  assert_eq!(verdict.status, PostureStatus::Good);
  assert_eq!(session.snapshot_stats().total_frames, 1);
}

#[test]
fn stats_track_every_classified_frame() {
  let mut session = calibrated(MemorySink::new());
  let mut bad = 0;
  for i in 30..50 {
    let frame = if i % 4 == 0 { hunched(i) } else { upright(i) };
    if session.process_frame(&frame).unwrap().is_poor() {
      bad += 1;
    }
  }

  let stats = session.snapshot_stats();
  assert_eq!(stats.total_frames, 20);
  assert_eq!(stats.bad_posture_frames, bad);
  assert_eq!(bad, 5);
  assert_eq!(stats.violation_counts[Violation::NeckForward.name()], 5);
  assert_eq!(stats.violation_counts[Violation::BackNotStraight.name()], 5);
}

#[test]
fn mode_switch_applies_on_next_frame() {
  let mut session = calibrated(MemorySink::new());

  let verdict = session.process_frame(&deep_squat(30)).unwrap();
  assert_eq!(verdict.violations, vec![Violation::BackNotStraight]);

  session.set_mode(PostureMode::Squat);
  let verdict = session.process_frame(&deep_squat(31)).unwrap();
  assert_eq!(
    verdict.violations,
    vec![Violation::BackNotStraight, Violation::KneeOverToe]
  );
  assert!(session.thresholds().is_some());
  assert_eq!(session.snapshot_stats().total_frames, 2);

  let verdict = session
    .process_frame_in(&hunched(32), PostureMode::Sitting)
    .unwrap();
  assert_eq!(
    verdict.violations,
    vec![Violation::NeckForward, Violation::BackNotStraight]
  );
  assert_eq!(session.mode(), PostureMode::Sitting);
}

#[test]
fn no_person_frames_bypass_everything() {
  let sink = MemorySink::new();
  let mut session = calibrated(sink.clone());
  session.process_frame(&upright(30)).unwrap();
  let stats = session.snapshot_stats();
  let state = session.calibration_state().clone();
  let notifications = sink.notifications().len();

  let verdict = session
    .process_frame(&LandmarkFrame::no_person(10_000_000))
    .unwrap();
  assert_eq!(verdict.label(), "No Person Detected");
  assert!(verdict.violations.is_empty());
  assert_eq!(session.snapshot_stats(), stats);
  assert_eq!(session.calibration_state(), &state);
  assert_eq!(sink.notifications().len(), notifications);
}

#[test]
fn notifications_respect_shared_cooldown() {
  let sink = MemorySink::new();
  let mut session = calibrated(sink.clone());

  // 30 * 100ms = 3s，首帧提醒后 10s 内不再提醒
  session.process_frame(&upright(30)).unwrap();
  session.process_frame(&hunched(60)).unwrap();
  session.process_frame(&hunched(131)).unwrap();

  let notifications = sink.notifications();
  assert_eq!(notifications.len(), 2);
  assert_eq!(notifications[0].kind, NotificationKind::Good);
  assert_eq!(notifications[1].kind, NotificationKind::Poor);
  assert_eq!(
    notifications[1].violations,
    vec![Violation::NeckForward, Violation::BackNotStraight]
  );
}

#[test]
fn independent_sessions_do_not_share_state() {
  let mut first = calibrated(MemorySink::new());
  let mut second = PostureSession::with_sink(SessionConfig::new(), MemorySink::new());

  first.process_frame(&hunched(30)).unwrap();
  assert_eq!(
    second.process_frame(&hunched(0)).unwrap().label(),
    "Calibrating 1/30"
  );
  assert_eq!(first.snapshot_stats().total_frames, 1);
  assert_eq!(second.snapshot_stats().total_frames, 0);
}
