use std::collections::HashMap;
use std::io::Write;

use parking_lot::Mutex;

use crate::types::LogLine;

const RESET: &str = "\x1b[0m";

/// Tag colors cycled across pods, matching kubectl's usual palette order
const PALETTE: [&str; 6] = [
    "\x1b[34m", // blue
    "\x1b[32m", // green
    "\x1b[33m", // yellow
    "\x1b[35m", // magenta
    "\x1b[36m", // cyan
    "\x1b[31m", // red
];

/// Serializes line emission from all stream workers into one sink.
///
/// Each submission is formatted and written as a single unit under the
/// writer lock, so lines from concurrent workers never interleave. The
/// aggregator itself never reorders or buffers across submissions.
pub struct LogAggregator {
    writer: Mutex<Box<dyn Write + Send>>,
    colors: HashMap<String, &'static str>,
}

impl LogAggregator {
    /// Build an aggregator over `writer`, assigning each known pod a tag
    /// color from the palette. With `color` off, tags are written plain.
    pub fn new(writer: Box<dyn Write + Send>, pods: &[String], color: bool) -> Self {
        let colors = if color {
            pods.iter()
                .enumerate()
                .map(|(i, pod)| (pod.clone(), PALETTE[i % PALETTE.len()]))
                .collect()
        } else {
            HashMap::new()
        };

        Self {
            writer: Mutex::new(writer),
            colors,
        }
    }

    /// Write one tagged line atomically. Safe to call from any worker.
    pub fn submit(&self, line: &LogLine) {
        let formatted = match self.colors.get(&line.pod_name) {
            Some(color) => format!("{color}{} | {RESET}{}\n", line.pod_name, line.text),
            None => format!("{} | {}\n", line.pod_name, line.text),
        };

        let mut writer = self.writer.lock();
        // A broken pipe here means the consumer is gone; nothing useful
        // to do with the error at this level.
        let _ = writer.write_all(formatted.as_bytes());
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Write half that shares its buffer with the test body
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn test_plain_tag_format() {
        let buf = SharedBuf::default();
        let agg = LogAggregator::new(Box::new(buf.clone()), &["web-1".to_string()], false);
        agg.submit(&LogLine::new("web-1", "hello"));
        assert_eq!(buf.lines(), vec!["web-1 | hello"]);
    }

    #[test]
    fn test_colored_tag_wraps_pod_name_only() {
        let pods = vec!["web-1".to_string()];
        let buf = SharedBuf::default();
        let agg = LogAggregator::new(Box::new(buf.clone()), &pods, true);
        agg.submit(&LogLine::new("web-1", "hello"));
        assert_eq!(buf.lines(), vec!["\x1b[34mweb-1 | \x1b[0mhello"]);
    }

    #[test]
    fn test_unknown_pod_falls_back_to_plain() {
        let pods = vec!["web-1".to_string()];
        let buf = SharedBuf::default();
        let agg = LogAggregator::new(Box::new(buf.clone()), &pods, true);
        agg.submit(&LogLine::new("stray-pod", "hi"));
        assert_eq!(buf.lines(), vec!["stray-pod | hi"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_never_interleave() {
        let pods: Vec<String> = (0..4).map(|i| format!("pod-{i}")).collect();
        let buf = SharedBuf::default();
        let agg = Arc::new(LogAggregator::new(Box::new(buf.clone()), &pods, false));

        let mut tasks = Vec::new();
        for pod in &pods {
            let agg = Arc::clone(&agg);
            let pod = pod.clone();
            tasks.push(tokio::spawn(async move {
                for n in 0..250 {
                    agg.submit(&LogLine::new(pod.clone(), format!("{pod} msg {n}")));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let lines = buf.lines();
        assert_eq!(lines.len(), 4 * 250);
        // Every output line is exactly one submission, intact.
        for line in &lines {
            let (tag, text) = line.split_once(" | ").expect("tagged line");
            assert!(text.starts_with(tag), "interleaved line: {line}");
        }
    }
}
