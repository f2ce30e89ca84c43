use std::io::{self, Write};

use crate::commands::types::{Window, REGION_PLAN_LABEL};

pub(crate) type Result<T> = std::result::Result<T, io::Error>;

/// Sink for rendered window annotations.
pub(crate) trait Directives {
    fn window(&mut self, window: &Window, max_bound: i64, region_capacity: i64) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Emits `set obj rect` / `set label` pairs that gnuplot loads on top of a chart.
pub(crate) struct GnuplotWriter<W: Write> {
    out: W,
}

impl<W: Write> GnuplotWriter<W> {
    pub(crate) fn new(out: W) -> Self {
        GnuplotWriter { out }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Directives for GnuplotWriter<W> {
    fn window(&mut self, window: &Window, max_bound: i64, region_capacity: i64) -> Result<()> {
        let style = window.style();

        // the rectangle always runs to the end of the experiment; later windows paint over it
        writeln!(
            self.out,
            "set obj rect fc rgb '{}' fs solid 0.1 from {}, graph 0 to {}, graph 1",
            style.color, window.previous, max_bound,
        )?;
        writeln!(
            self.out,
            "set label \"{}\" at {},{} center font 'Verdana,7'\n",
            REGION_PLAN_LABEL,
            window.mid(),
            window.label_y(region_capacity),
        )
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()
    }
}
