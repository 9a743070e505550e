// 该文件是 Duanzuo （端坐） 项目的一部分。
// src/geometry.rs - 关节角度几何计算
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

use std::ops::Sub;

use serde::{Deserialize, Serialize};

/// 分母保护项，退化（重合）点不会报错，只会得到一个有定义的角度
const NORM_EPSILON: f64 = 1e-6;

/// 图像坐标系中的“向上”方向（y 轴向下）
const UP: Point = Point { x: 0.0, y: -1.0 };

/// 图像像素坐标系下的二维点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  pub fn dot(self, other: Point) -> f64 {
    self.x * other.x + self.y * other.y
  }

  pub fn norm(self) -> f64 {
    self.dot(self).sqrt()
  }

  pub fn midpoint(self, other: Point) -> Point {
    Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
  }
}

impl Sub for Point {
  type Output = Point;

  fn sub(self, rhs: Point) -> Point {
    Point::new(self.x - rhs.x, self.y - rhs.y)
  }
}

impl From<(f64, f64)> for Point {
  fn from((x, y): (f64, f64)) -> Self {
    Point::new(x, y)
  }
}

fn angle_between(u: Point, v: Point) -> f64 {
  let cosine = u.dot(v) / (u.norm() * v.norm() + NORM_EPSILON);
  cosine.clamp(-1.0, 1.0).acos().to_degrees()
}

/// 计算以 `b` 为顶点、射线 `b→a` 与 `b→c` 之间的夹角（度），结果在 [0, 180] 内
pub fn vertex_angle(a: Point, b: Point, c: Point) -> f64 {
  angle_between(a - b, c - b)
}

/// 向量与竖直向上方向之间的夹角（度）
pub fn tilt_from_vertical(vector: Point) -> f64 {
  angle_between(vector, UP)
}
