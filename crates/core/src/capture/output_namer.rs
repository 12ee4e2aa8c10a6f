use std::path::{Path, PathBuf};

/// Chooses where a finished session's composition is written.
pub trait OutputNamer: Send {
    fn next_output(&mut self) -> PathBuf;
}

/// Names outputs after the local wall-clock time, e.g.
/// `2026-10-17_14-03-59.png`. A second session within the same second gets
/// a numeric suffix instead of overwriting.
pub struct TimestampNamer {
    folder: PathBuf,
    last_stem: Option<String>,
    repeats: usize,
}

impl TimestampNamer {
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
            last_stem: None,
            repeats: 0,
        }
    }

    fn name_for(&mut self, stem: String) -> PathBuf {
        if self.last_stem.as_deref() == Some(stem.as_str()) {
            self.repeats += 1;
        } else {
            self.repeats = 0;
        }
        let file_name = if self.repeats == 0 {
            format!("{stem}.png")
        } else {
            format!("{stem}-{}.png", self.repeats)
        };
        self.last_stem = Some(stem);
        self.folder.join(file_name)
    }
}

impl OutputNamer for TimestampNamer {
    fn next_output(&mut self) -> PathBuf {
        let stem = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        self.name_for(stem)
    }
}
