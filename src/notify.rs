// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/notify.rs - 姿态提醒与冷却
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

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::Violation;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Good,
  Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
  pub kind: NotificationKind,
  pub violations: Vec<Violation>,
  /// 相对会话时间轴的时间戳
  pub at: Duration,
}

/// 提醒的最终去向由调用方决定
pub trait NotificationSink: Send {
  fn notify(&mut self, notification: &Notification);
}

/// 默认去向：写入 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
  fn notify(&mut self, notification: &Notification) {
    match notification.kind {
      NotificationKind::Poor => {
        let names: Vec<&str> = notification.violations.iter().map(Violation::name).collect();
        warn!("姿态不良提醒 @ {:.2?}: {}", notification.at, names.join("; "));
      }
      NotificationKind::Good => info!("姿态良好 @ {:.2?}", notification.at),
    }
  }
}

/// 把提醒收集到共享列表中，克隆出的句柄可在外部读取
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
  notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self
      .notifications
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl NotificationSink for MemorySink {
  fn notify(&mut self, notification: &Notification) {
    self
      .notifications
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(notification.clone());
  }
}

/// 冷却限流的提醒器
///
/// 良好与不良提醒共用同一个冷却计时器，只影响提醒频率，不影响判定结果与统计。
pub struct AlertNotifier {
  cooldown: Duration,
  last_notified_at: Option<Duration>,
  sink: Box<dyn NotificationSink>,
}

impl AlertNotifier {
  pub fn new(cooldown: Duration) -> Self {
    Self::with_sink(cooldown, TracingSink)
  }

  pub fn with_sink(cooldown: Duration, sink: impl NotificationSink + 'static) -> Self {
    Self {
      cooldown,
      last_notified_at: None,
      sink: Box::new(sink),
    }
  }

  pub fn cooldown(&self) -> Duration {
    self.cooldown
  }

  pub fn last_notified_at(&self) -> Option<Duration> {
    self.last_notified_at
  }

  /// 距上次提醒超过冷却时间才发出提醒，返回本次是否发出
  pub fn maybe_notify(&mut self, violations: &[Violation], now: Duration) -> bool {
    let due = match self.last_notified_at {
      None => true,
      Some(last) => now.saturating_sub(last) > self.cooldown,
    };
    if !due {
      return false;
    }

    let kind = if violations.is_empty() {
      NotificationKind::Good
    } else {
      NotificationKind::Poor
    };
    self.sink.notify(&Notification {
      kind,
      violations: violations.to_vec(),
      at: now,
    });
    self.last_notified_at = Some(now);
    true
  }
}
