//! Anchor points for watermark placement and gravity crops.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of nine anchors on a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gravity {
    #[default]
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Gravity {
    pub const ALL: [Gravity; 9] = [
        Gravity::TopLeft,
        Gravity::Top,
        Gravity::TopRight,
        Gravity::Left,
        Gravity::Center,
        Gravity::Right,
        Gravity::BottomLeft,
        Gravity::Bottom,
        Gravity::BottomRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gravity::TopLeft => "top-left",
            Gravity::Top => "top",
            Gravity::TopRight => "top-right",
            Gravity::Left => "left",
            Gravity::Center => "center",
            Gravity::Right => "right",
            Gravity::BottomLeft => "bottom-left",
            Gravity::Bottom => "bottom",
            Gravity::BottomRight => "bottom-right",
        }
    }

    /// Anchor on each axis, in halves: 0 = start, 1 = middle, 2 = end.
    fn factors(self) -> (i64, i64) {
        match self {
            Gravity::TopLeft => (0, 0),
            Gravity::Top => (1, 0),
            Gravity::TopRight => (2, 0),
            Gravity::Left => (0, 1),
            Gravity::Center => (1, 1),
            Gravity::Right => (2, 1),
            Gravity::BottomLeft => (0, 2),
            Gravity::Bottom => (1, 2),
            Gravity::BottomRight => (2, 2),
        }
    }

    /// The anchor itself on a `width` × `height` picture.
    pub fn point_on_picture(self, width: i64, height: i64) -> (i64, i64) {
        let (fx, fy) = self.factors();
        (anchor(width, fx), anchor(height, fy))
    }

    /// Top-left corner for a `wm_width` × `wm_height` overlay so that it sits
    /// at this anchor of a `width` × `height` picture. Negative when the
    /// overlay is larger than the picture.
    pub fn point_watermark(self, width: i64, height: i64, wm_width: i64, wm_height: i64) -> (i64, i64) {
        let (fx, fy) = self.factors();
        (anchor(width - wm_width, fx), anchor(height - wm_height, fy))
    }
}

/// `slack * halves / 2`; the middle anchor truncates towards zero.
fn anchor(slack: i64, halves: i64) -> i64 {
    match halves {
        0 => 0,
        1 => slack / 2,
        _ => slack,
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gravity {
    type Err = PipelineError;

    /// Accepts the canonical names plus one- and two-letter aliases in either
    /// order (`tl`/`lt`, `t`/`tc`/`ct`, ...). An empty string is top-left.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let gravity = match lower.as_str() {
            "" | "tl" | "lt" => Gravity::TopLeft,
            "t" | "tc" | "ct" => Gravity::Top,
            "tr" | "rt" => Gravity::TopRight,
            "l" | "cl" | "lc" => Gravity::Left,
            "c" | "cc" => Gravity::Center,
            "r" | "cr" | "rc" => Gravity::Right,
            "bl" | "lb" => Gravity::BottomLeft,
            "b" | "bc" | "cb" => Gravity::Bottom,
            "br" | "rb" => Gravity::BottomRight,
            other => Gravity::ALL
                .into_iter()
                .find(|g| g.name() == other)
                .ok_or_else(|| {
                    PipelineError::InvalidArgument(format!("not a valid gravity {s:?}"))
                })?,
        };
        Ok(gravity)
    }
}

impl TryFrom<String> for Gravity {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gravity> for String {
    fn from(gravity: Gravity) -> Self {
        gravity.name().to_string()
    }
}
