use serde::{Deserialize, Serialize};

/// Logical screen region a scan reads from.
///
/// The integer encoding is part of the persisted configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TargetKind {
    /// Object under the review/navigator cursor.
    Navigator,
    /// The whole screen.
    Screen,
    /// The foreground window.
    Window,
    /// The control holding input focus.
    Focus,
}

impl TargetKind {
    pub const ALL: [TargetKind; 4] = [
        TargetKind::Navigator,
        TargetKind::Screen,
        TargetKind::Window,
        TargetKind::Focus,
    ];

    pub fn index(self) -> usize {
        match self {
            TargetKind::Navigator => 0,
            TargetKind::Screen => 1,
            TargetKind::Window => 2,
            TargetKind::Focus => 3,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(TargetKind::Navigator),
            1 => Some(TargetKind::Screen),
            2 => Some(TargetKind::Window),
            3 => Some(TargetKind::Focus),
            _ => None,
        }
    }
}

impl TryFrom<i64> for TargetKind {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        TargetKind::from_index(value).ok_or_else(|| format!("target index {value} out of range 0-3"))
    }
}

impl From<TargetKind> for i64 {
    fn from(value: TargetKind) -> Self {
        value.index() as i64
    }
}

/// Key for per-scan state: which application and which target produced a text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanKey {
    pub app: String,
    pub target: TargetKind,
}

impl ScanKey {
    pub fn new(app: impl Into<String>, target: TargetKind) -> Self {
        Self {
            app: app.into(),
            target,
        }
    }
}
