// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/bin/posture_stream.rs - 实时姿态分析
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use duanzuo::{
  FromUrl, PostureMode, PostureSession, SessionConfig,
  input::InputWrapper,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Duanzuo 实时姿态分析
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 会话配置，例如 posture://?mode=squat&cooldown=10
  #[arg(long, value_name = "CONFIG", default_value = "posture://")]
  pub config: Url,
  /// 关键点输入来源（landmarks:///path.jsonl 或 stdin://）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 判定结果输出（log://、jsonl:///path 或 folder:///dir）
  #[arg(long, value_name = "OUTPUT", default_value = "log://?changes")]
  pub output: Url,
  /// 覆盖配置中的姿态模式（sitting 或 squat）
  #[arg(long, value_name = "MODE")]
  pub mode: Option<PostureMode>,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("会话配置: {}", args.config);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let mut config = SessionConfig::from_url(&args.config)?;
  if let Some(mode) = args.mode {
    config = config.with_mode(mode);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let mut session = PostureSession::new(config);

  let stats = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_interrupt(true)
    .run_task(input, &mut session, output)?;

  info!("总帧数: {}", stats.total_frames);
  info!(
    "姿态不良帧数: {} ({:.1}%)",
    stats.bad_posture_frames,
    stats.bad_posture_ratio() * 100.0
  );
  for (name, count) in &stats.violation_counts {
    info!("  - {}: {}", name, count);
  }

  Ok(())
}
