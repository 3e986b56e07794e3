use std::path::{Path, PathBuf};

/// Where the process runs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Working directory at startup.
    pub cwd: PathBuf,
    /// Directory holding the executable.
    pub install_dir: PathBuf,
    /// Short name used in log file names, `main` or `quit`.
    pub process_name: String,
}

impl HostContext {
    pub fn new(cwd: impl Into<PathBuf>, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            install_dir: install_dir.into(),
            process_name: "main".to_string(),
        }
    }

    /// Context of the running process.
    pub fn current() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let exe = std::env::current_exe()?;
        let install_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        Ok(Self::new(cwd, install_dir))
    }

    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }
}
