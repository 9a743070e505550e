// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/bin/posture_report.rs - 批量姿态分析报告
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use duanzuo::{
  FromUrl, PostureMode, PostureSession, SessionConfig,
  input::InputWrapper,
  output::OutputWrapper,
  task::{ReportTask, Task},
};
use tracing::info;

/// Duanzuo 批量姿态分析报告
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 会话配置
  #[arg(long, value_name = "CONFIG", default_value = "posture://")]
  pub config: Url,
  /// 关键点输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 逐帧判定输出
  #[arg(long, value_name = "OUTPUT", default_value = "log://?changes")]
  pub output: Url,
  /// 覆盖配置中的姿态模式
  #[arg(long, value_name = "MODE")]
  pub mode: Option<PostureMode>,
  /// 报告 JSON 保存路径
  #[arg(long, value_name = "REPORT")]
  pub report: PathBuf,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("会话配置: {}", args.config);
  info!("输入来源: {}", args.input);
  info!("报告路径: {}", args.report.display());

  let mut config = SessionConfig::from_url(&args.config)?;
  if let Some(mode) = args.mode {
    config = config.with_mode(mode);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let mut session = PostureSession::new(config);

  let report = ReportTask.run_task(input, &mut session, output)?;
  report.save(&args.report)?;

  info!("总帧数: {}", report.summary.total_frames);
  info!("姿态不良帧数: {}", report.summary.bad_posture_frames);
  info!("报告已保存: {}", args.report.display());

  Ok(())
}
