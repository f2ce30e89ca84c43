use serde::Serialize;

/// Literal label body; the region identifiers are placeholders.
pub(crate) const REGION_PLAN_LABEL: &str = r"Region Plan:\n\\{X:,A:,B:,C:\\}";

pub(crate) const DEFAULT_REGION_CAPACITY: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Style {
    pub(crate) color: &'static str,
    pub(crate) label_offset: i64,
}

impl Style {
    pub(crate) fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            Style {
                color: "red",
                label_offset: 2,
            }
        } else {
            Style {
                color: "blue",
                label_offset: 4,
            }
        }
    }
}

/// One annotated span of the experiment timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) index: usize,
    pub(crate) previous: i64,
    pub(crate) current: i64,
}

impl Window {
    pub(crate) fn new(index: usize, previous: i64, current: i64) -> Self {
        Window {
            index,
            previous,
            current,
        }
    }

    /// Always lies between the two bounds, so it fits back into `i64`.
    pub(crate) fn mid(&self) -> i64 {
        let (previous, current) = (i128::from(self.previous), i128::from(self.current));
        (previous + (current - previous) / 2) as i64
    }

    pub(crate) fn style(&self) -> Style {
        Style::for_index(self.index)
    }

    pub(crate) fn label_y(&self, region_capacity: i64) -> i128 {
        i128::from(region_capacity) + i128::from(self.style().label_offset)
    }
}

/// JSON view of a window, as written to the `-win.json` sidecar.
#[derive(Debug, Serialize)]
pub(crate) struct WindowRecord {
    pub(crate) index: usize,
    pub(crate) previous: i64,
    pub(crate) current: i64,
    pub(crate) mid: i64,
    pub(crate) color: &'static str,
    pub(crate) label_y: i128,
}

impl WindowRecord {
    pub(crate) fn new(window: &Window, region_capacity: i64) -> Self {
        WindowRecord {
            index: window.index,
            previous: window.previous,
            current: window.current,
            mid: window.mid(),
            color: window.style().color,
            label_y: window.label_y(region_capacity),
        }
    }
}
