// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/task.rs - 帧处理任务
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

use std::sync::mpsc::{Receiver, channel};
use std::{thread, time::Duration};

use tracing::{info, warn};

use crate::{
  landmark::LandmarkFrame,
  output::Render,
  report::{ReportBuilder, SessionReport},
  session::{PostureSession, Verdict},
  stats::SessionStats,
};

/// 驱动一个会话消费输入、渲染输出
pub trait Task<I, O>: Sized {
  type Output;
  type Error;
  fn run_task(
    self,
    input: I,
    session: &mut PostureSession,
    output: O,
  ) -> Result<Self::Output, Self::Error>;
}

/// 实时流：逐帧处理直到输入结束、达到帧数上限或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interruptible: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 注册 Ctrl-C 处理，每个进程只能注册一次
  pub fn with_interrupt(mut self, interruptible: bool) -> Self {
    self.interruptible = interruptible;
    self
  }

  fn install_interrupt(&self) -> anyhow::Result<Option<Receiver<()>>> {
    if !self.interruptible {
      return Ok(None);
    }

    let (tx, rx) = channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(Some(rx))
  }
}

impl<I, IE, O, RE> Task<I, O> for ContinuousTask
where
  I: Iterator<Item = Result<LandmarkFrame, IE>>,
  IE: std::error::Error + Sync + Send + 'static,
  O: Render<LandmarkFrame, Verdict, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Output = SessionStats;
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    session: &mut PostureSession,
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务，模式: {}", session.mode());
    let interrupt = self.install_interrupt()?;

    let mut frame_index = 0;
    for frame in input {
      let frame = frame?;
      frame_index += 1;
      let now = std::time::Instant::now();
      let verdict = session.process_frame(&frame)?;
      output.render_result(&frame, &verdict)?;
      tracing::debug!("第 {} 帧处理完成，耗时: {:.2?}", frame_index, now.elapsed());

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }
    output.finish()?;

    let stats = session.snapshot_stats();
    info!(
      "任务完成，共 {} 帧，其中 {} 帧姿态不良",
      stats.total_frames, stats.bad_posture_frames
    );
    Ok(stats)
  }
}

/// 一次性处理完整输入（如上传的视频），返回逐帧反馈与汇总
#[derive(Default, Debug)]
pub struct ReportTask;

impl<I, IE, O, RE> Task<I, O> for ReportTask
where
  I: Iterator<Item = Result<LandmarkFrame, IE>>,
  IE: std::error::Error + Sync + Send + 'static,
  O: Render<LandmarkFrame, Verdict, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Output = SessionReport;
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    session: &mut PostureSession,
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始批量处理...");
    let now = std::time::Instant::now();
    let mut builder = ReportBuilder::new();
    for frame in input {
      let frame = frame?;
      let verdict = session.process_frame(&frame)?;
      output.render_result(&frame, &verdict)?;
      builder.push(&verdict);
    }
    output.finish()?;

    let report = builder.build(session);
    info!(
      "批量处理完成，共 {} 帧，耗时: {:.2?}",
      report.frame_feedback.len(),
      now.elapsed()
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::convert::Infallible;

  use super::*;
  use crate::{
    calibration::CalibrationConfig, config::SessionConfig, landmark::tests::upright_frame,
    notify::MemorySink, session::PostureStatus,
  };

  #[derive(Default)]
  struct Collect(RefCell<Vec<Verdict>>);

  impl Render<LandmarkFrame, Verdict> for &Collect {
    type Error = Infallible;

    fn render_result(&self, _frame: &LandmarkFrame, result: &Verdict) -> Result<(), Self::Error> {
      self.0.borrow_mut().push(result.clone());
      Ok(())
    }
  }

  fn session() -> PostureSession {
    let config = SessionConfig::new().with_calibration(CalibrationConfig {
      sample_target: 2,
      ..Default::default()
    });
    PostureSession::with_sink(config, MemorySink::new())
  }

  fn frames(n: u64) -> impl Iterator<Item = Result<LandmarkFrame, Infallible>> {
    (0..n).map(|i| Ok(upright_frame(i * 33)))
  }

  #[test]
  fn continuous_stops_at_frame_number() {
    let collect = Collect::default();
    let mut session = session();
    let stats = ContinuousTask::default()
      .with_frame_number(Some(3))
      .run_task(frames(10), &mut session, &collect)
      .unwrap();
    assert_eq!(collect.0.borrow().len(), 3);
    assert_eq!(stats.total_frames, 1);
  }

  #[test]
  fn report_covers_every_frame() {
    let collect = Collect::default();
    let mut session = session();
    let report = ReportTask.run_task(frames(4), &mut session, &collect).unwrap();
    assert_eq!(report.frame_feedback.len(), 4);
    assert_eq!(
      report.frame_feedback[1].status,
      PostureStatus::Calibrating {
        collected: 2,
        target: 2
      }
    );
    assert_eq!(report.frame_feedback[3].status, PostureStatus::Good);
    assert_eq!(report.summary.total_frames, 2);
  }
}
