//! Shared types for deptail
//!
//! Data structures passed between the CLI, the Kubernetes layer, and the
//! tail engine.

/// Parameters for one tail invocation, immutable once built
#[derive(Clone, Debug)]
pub struct TailRequest {
    /// Resolved pod names to tail
    pub sources: Vec<String>,

    /// Container to read from (None = the pod's default/only container)
    pub container: Option<String>,

    /// Keep streaming until the pod itself stops producing
    pub follow: bool,

    /// Start from only the last N lines per pod (None = all available)
    pub tail_lines: Option<i64>,
}

impl TailRequest {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            container: None,
            follow: false,
            tail_lines: None,
        }
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn with_tail_lines(mut self, tail_lines: Option<i64>) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    /// The per-source transport parameters, forwarded verbatim
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            container: self.container.clone(),
            follow: self.follow,
            tail_lines: self.tail_lines,
        }
    }
}

/// Transport parameters for opening one pod's log stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamOptions {
    pub container: Option<String>,
    pub follow: bool,
    pub tail_lines: Option<i64>,
}

/// A complete log line plus the pod that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub pod_name: String,
    pub text: String,
}

impl LogLine {
    pub fn new(pod_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
            text: text.into(),
        }
    }
}

/// Outcome of one tail invocation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TailSummary {
    /// Sources a worker was started for
    pub started: usize,

    /// Sources that failed to open or died mid-stream
    pub failed: usize,
}

impl TailSummary {
    /// True when every started source completed cleanly
    pub fn all_clean(&self) -> bool {
        self.failed == 0
    }
}
