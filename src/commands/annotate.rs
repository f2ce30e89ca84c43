use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};

use super::error::{AnnotateError, Result};
use super::types::{Window, WindowRecord};
use crate::gnuplot::{Directives, GnuplotWriter};

/// Running state of the scan over input lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BoundScan {
    last: i64,
    current: i64,
    line_count: usize,
}

impl BoundScan {
    /// Feeds one input line; returns the window it closes, if any.
    fn step(self, line: &str) -> (Self, Option<Window>) {
        let current = if self.line_count > 0 {
            parse_bound(line, self.line_count)
        } else {
            self.current
        };
        let window =
            (self.line_count > 1).then(|| Window::new(self.line_count, self.last, current));
        let next = BoundScan {
            last: current,
            current,
            line_count: self.line_count + 1,
        };
        (next, window)
    }

    fn closing(&self, max_bound: i64) -> Window {
        if self.line_count > 2 {
            Window::new(self.line_count, self.last, max_bound)
        } else {
            Window::new(0, 0, max_bound)
        }
    }
}

/// Reads a boundary the way C `atoi` does: leading whitespace, an optional
/// sign, then the digit prefix. Anything unreadable becomes 0.
fn parse_bound(line: &str, line_no: usize) -> i64 {
    let text = line.trim_start();
    if let Ok(value) = text.trim_end().parse::<i64>() {
        return value;
    }

    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    let value = text[..sign_len + digits].parse::<i64>().unwrap_or(0);
    warn!(
        "line {}: `{}` is not a plain integer, using {}",
        line_no + 1,
        line.trim_end(),
        value
    );
    value
}

/// Computes every window for the given input lines, closing window included.
fn scan_windows<I>(lines: I, max_bound: i64) -> io::Result<Vec<Window>>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut windows = Vec::new();
    let scan = lines
        .into_iter()
        .try_fold(BoundScan::default(), |scan, line| {
            let (next, window) = scan.step(&line?);
            windows.extend(window);
            Ok::<_, io::Error>(next)
        })?;
    windows.push(scan.closing(max_bound));
    Ok(windows)
}

fn read_lines(file: File) -> impl Iterator<Item = io::Result<String>> {
    BufReader::new(file)
        .split(b'\n')
        .map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub struct Annotate {
    input: PathBuf,
    max_bound: i64,
    region_capacity: i64,
    json: bool,
}

impl Annotate {
    pub fn new(input: PathBuf, max_bound: i64, region_capacity: i64, json: bool) -> Self {
        Annotate {
            input,
            max_bound,
            region_capacity,
            json,
        }
    }

    #[cfg(test)]
    pub fn region_capacity(&self) -> i64 {
        self.region_capacity
    }

    pub fn output_path(&self) -> PathBuf {
        sibling_path(&self.input, "-win.dat")
    }

    pub fn json_path(&self) -> PathBuf {
        sibling_path(&self.input, "-win.json")
    }

    pub fn execute(&self) -> Result<()> {
        let input = File::open(&self.input).map_err(|source| AnnotateError::InputAccess {
            path: self.input.clone(),
            source,
        })?;

        let output_path = self.output_path();
        debug!("writing annotations to {}", output_path.display());
        let output = File::create(&output_path).map_err(|source| AnnotateError::OutputAccess {
            path: output_path.clone(),
            source,
        })?;

        let windows =
            scan_windows(read_lines(input), self.max_bound).map_err(|source| AnnotateError::Read {
                path: self.input.clone(),
                source,
            })?;

        let mut writer = GnuplotWriter::new(BufWriter::new(output));
        self.render(&windows, &mut writer)
            .map_err(|source| AnnotateError::Write {
                path: output_path,
                source,
            })?;

        if self.json {
            self.write_json(&windows)?;
        }

        trace!("{} windows written", windows.len());
        Ok(())
    }

    fn render(&self, windows: &[Window], directives: &mut dyn Directives) -> io::Result<()> {
        for window in windows {
            info!(
                "window {}: [{}, {}, {}] cap: {}",
                window.index, window.previous, window.current, self.max_bound, self.region_capacity
            );
            directives.window(window, self.max_bound, self.region_capacity)?;
        }
        directives.finish()
    }

    fn write_json(&self, windows: &[Window]) -> Result<()> {
        let json_path = self.json_path();
        debug!("writing window summary to {}", json_path.display());
        let file = File::create(&json_path).map_err(|source| AnnotateError::OutputAccess {
            path: json_path.clone(),
            source,
        })?;

        let records: Vec<WindowRecord> = windows
            .iter()
            .map(|window| WindowRecord::new(window, self.region_capacity))
            .collect();
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &records).map_err(|source| AnnotateError::Json {
            path: json_path.clone(),
            source,
        })?;
        out.flush().map_err(|source| AnnotateError::Write {
            path: json_path,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_bound, scan_windows, Annotate};
    use crate::commands::error::AnnotateError;
    use crate::commands::types::Window;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    fn lines(text: &str) -> Vec<io::Result<String>> {
        text.lines().map(|l| Ok(l.to_owned())).collect()
    }

    fn write_input(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_timeline_windows() {
        let windows =
            scan_windows(lines("timestamp\n29\n110029\n260029\n410029\n"), 1500000).unwrap();
        assert_eq!(
            windows,
            vec![
                Window::new(2, 29, 110029),
                Window::new(3, 110029, 260029),
                Window::new(4, 260029, 410029),
                Window::new(5, 410029, 1500000),
            ]
        );
    }

    #[test]
    fn test_two_boundaries_then_closing() {
        let windows = scan_windows(lines("2\n100\n250\n"), 1000).unwrap();
        assert_eq!(
            windows,
            vec![Window::new(2, 100, 250), Window::new(3, 250, 1000)]
        );
    }

    #[test]
    fn test_short_input_falls_back() {
        for text in ["", "header\n", "header\n42\n"] {
            let windows = scan_windows(lines(text), 700).unwrap();
            assert_eq!(windows, vec![Window::new(0, 0, 700)], "input {:?}", text);
        }
    }

    #[test]
    fn test_header_is_never_a_bound() {
        let windows = scan_windows(lines("99999\n10\n20\n"), 50).unwrap();
        assert_eq!(windows[0], Window::new(2, 10, 20));
    }

    #[test]
    fn test_parse_bound_is_lenient() {
        assert_eq!(parse_bound("110029", 1), 110029);
        assert_eq!(parse_bound("  42\r", 1), 42);
        assert_eq!(parse_bound("-7", 1), -7);
        assert_eq!(parse_bound("123abc", 1), 123);
        assert_eq!(parse_bound("+5 ms", 1), 5);
        assert_eq!(parse_bound("abc", 1), 0);
        assert_eq!(parse_bound("", 1), 0);
        assert_eq!(parse_bound("-", 1), 0);
    }

    #[test]
    fn test_read_error_stops_the_scan() {
        let input = vec![
            Ok("h".to_owned()),
            Err(io::Error::new(io::ErrorKind::Other, "disk")),
        ];
        assert!(scan_windows(input, 10).is_err());
    }

    #[test]
    fn test_execute_writes_win_dat() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "plan.txt", "timestamp\n29\n110029\n");
        let annotate = Annotate::new(input, 1500000, 20, false);
        annotate.execute().unwrap();

        let output = fs::read_to_string(dir.path().join("plan.txt-win.dat")).unwrap();
        let expected = "\
set obj rect fc rgb 'red' fs solid 0.1 from 29, graph 0 to 1500000, graph 1
set label \"Region Plan:\\n\\\\{X:,A:,B:,C:\\\\}\" at 55029,22 center font 'Verdana,7'

set obj rect fc rgb 'blue' fs solid 0.1 from 110029, graph 0 to 1500000, graph 1
set label \"Region Plan:\\n\\\\{X:,A:,B:,C:\\\\}\" at 805014,24 center font 'Verdana,7'

";
        assert_eq!(output, expected);
        assert!(!dir.path().join("plan.txt-win.json").exists());
    }

    #[test]
    fn test_execute_fallback_window() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "empty.txt", "1\n");
        Annotate::new(input, 1000, 20, false).execute().unwrap();

        let output = fs::read_to_string(dir.path().join("empty.txt-win.dat")).unwrap();
        assert_eq!(
            output,
            "set obj rect fc rgb 'red' fs solid 0.1 from 0, graph 0 to 1000, graph 1\n\
             set label \"Region Plan:\\n\\\\{X:,A:,B:,C:\\\\}\" at 500,22 center font 'Verdana,7'\n\n"
        );
    }

    #[test]
    fn test_execute_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "t.txt", "x\n1\n5\n9\n");
        let annotate = Annotate::new(input, 100, 7, false);

        annotate.execute().unwrap();
        let first = fs::read(annotate.output_path()).unwrap();
        annotate.execute().unwrap();
        let second = fs::read(annotate.output_path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_execute_truncates_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "t.txt", "x\n");
        let stale = "stale\n".repeat(100);
        fs::write(dir.path().join("t.txt-win.dat"), &stale).unwrap();

        Annotate::new(input, 10, 20, false).execute().unwrap();
        let output = fs::read_to_string(dir.path().join("t.txt-win.dat")).unwrap();
        assert!(!output.contains("stale"));
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("nope.txt");
        let err = Annotate::new(input, 10, 20, false).execute().unwrap_err();

        assert!(matches!(err, AnnotateError::InputAccess { .. }));
        assert!(!dir.path().join("nope.txt-win.dat").exists());
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "t.txt", "x\n");
        // a directory in the way of the output file
        fs::create_dir(dir.path().join("t.txt-win.dat")).unwrap();

        let err = Annotate::new(input, 10, 20, false).execute().unwrap_err();
        assert!(matches!(err, AnnotateError::OutputAccess { .. }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_json_sidecar_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "t.txt", "x\n0\n29\n");
        let annotate = Annotate::new(input, 100, 20, true);
        std::os::unix::fs::symlink("/dev/full", annotate.json_path()).unwrap();

        let err = annotate.execute().unwrap_err();
        match err {
            AnnotateError::Write { path, .. } => assert_eq!(path, annotate.json_path()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_extreme_bounds_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            &dir,
            "t.txt",
            "x\n-9223372036854775808\n9223372036854775807\n",
        );
        let annotate = Annotate::new(input, 100, i64::MAX, false);
        annotate.execute().unwrap();

        let output = fs::read_to_string(annotate.output_path()).unwrap();
        assert!(output.contains("from -9223372036854775808, graph 0 to 100, graph 1"));
        assert!(output.contains(" at -1,9223372036854775809 center "));
    }

    #[test]
    fn test_json_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(&dir, "t.txt", "x\n0\n29\n");
        let annotate = Annotate::new(input, 100, 20, true);
        annotate.execute().unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(annotate.json_path()).unwrap()).unwrap();
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["mid"], 14);
        assert_eq!(records[0]["color"], "red");
        assert_eq!(records[1]["index"], 3);
        assert_eq!(records[1]["label_y"], 24);
    }
}
