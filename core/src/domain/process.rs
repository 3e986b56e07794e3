//! Process snapshots and sibling-instance identity.
//!
//! Matching is a pure function of a [`ProcessRecord`] and the caller's own
//! [`SelfIdentity`], so it can be exercised with synthetic process lists.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

/// Program name sibling instances are launched as.
pub const PROGRAM_NAME: &str = "px";

/// One process as seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    /// Parent process id, if known.
    pub ppid: Option<u32>,
    /// Resolved executable path; `None` when the OS refused to tell us.
    pub exe: Option<String>,
    /// Command line arguments, program first.
    pub cmdline: Vec<String>,
}

impl ProcessRecord {
    pub fn new(pid: u32, ppid: Option<u32>, exe: Option<&str>, cmdline: &[&str]) -> Self {
        Self {
            pid,
            ppid,
            exe: exe.map(str::to_string),
            cmdline: cmdline.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Target platform conventions used for path normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    fn exe_suffix(self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            Platform::Unix => "",
        }
    }
}

/// How the running program was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// The executable is the program itself; path equality is enough.
    Compiled,
    /// The executable is a host (runner, interpreter) and the command line
    /// must show it was asked to run `program`.
    Interpreted { program: String },
}

/// The caller's own identity, compared against every scanned process.
#[derive(Debug, Clone)]
pub struct SelfIdentity {
    /// Own pid and parent pid, never matched.
    pub excluded: Vec<u32>,
    /// Normalized executable path.
    pub exe: String,
    pub launch: LaunchMode,
    pub platform: Platform,
    entry_pattern: Regex,
}

impl SelfIdentity {
    pub fn new(
        excluded: Vec<u32>,
        exe: &str,
        launch: LaunchMode,
        platform: Platform,
    ) -> Self {
        let program = match &launch {
            LaunchMode::Interpreted { program } => program.as_str(),
            LaunchMode::Compiled => PROGRAM_NAME,
        };
        // `<program>`, `<program>.py` or `<program><exe suffix>` at the end of an argument
        let entry_pattern = Regex::new(&format!(
            r"(?i)(^|[\\/]){}(\.py|{})?$",
            regex::escape(program),
            regex::escape(platform.exe_suffix())
        ))
        .expect("escaped program name is a valid pattern");

        Self {
            excluded,
            exe: normalize_exe_path(exe, platform),
            launch,
            platform,
            entry_pattern,
        }
    }

    /// Identity of the running process.
    pub fn current() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let exe = std::fs::canonicalize(&exe).unwrap_or(exe);
        let stem = exe
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let launch = if stem == PROGRAM_NAME {
            LaunchMode::Compiled
        } else {
            LaunchMode::Interpreted {
                program: PROGRAM_NAME.to_string(),
            }
        };

        let mut excluded = vec![std::process::id()];
        #[cfg(unix)]
        excluded.push(std::os::unix::process::parent_id());

        Ok(Self::new(
            excluded,
            &exe.to_string_lossy(),
            launch,
            Platform::current(),
        ))
    }

    /// This identity with the parent of the own process, as found in
    /// `records`, also excluded.
    pub fn with_parent_from(&self, records: &[ProcessRecord]) -> Self {
        let mut me = self.clone();
        let own = self.excluded.first().copied();
        let parent = records
            .iter()
            .find(|r| Some(r.pid) == own)
            .and_then(|r| r.ppid);
        if let Some(ppid) = parent.filter(|p| !me.excluded.contains(p)) {
            me.excluded.push(ppid);
        }
        me
    }

    fn launched_as_program(&self, cmdline: &[String]) -> bool {
        let LaunchMode::Interpreted { program } = &self.launch else {
            return true;
        };
        // Module invocation: `<host> -m <program>`
        let module = cmdline.iter().any(|a| a == "-m") && cmdline.iter().any(|a| a == program);
        module
            || cmdline
                .iter()
                .skip(1)
                .any(|arg| self.entry_pattern.is_match(arg))
    }
}

/// Case-normalize an executable path, applying platform prefix rules.
///
/// On Windows a missing `.exe` extension is added and a single leading
/// backslash (`\IP\share`) is widened to a UNC prefix.
pub fn normalize_exe_path(path: &str, platform: Platform) -> String {
    let mut path = path.to_lowercase();
    if platform == Platform::Windows {
        let bytes = path.as_bytes();
        if bytes.len() > 1 && bytes[0] == b'\\' && bytes[1] != b'\\' {
            path.insert(0, '\\');
        }
        let has_ext = Path::new(&path.replace('\\', "/"))
            .extension()
            .is_some();
        if !has_ext {
            path.push_str(".exe");
        }
    }
    path
}

/// Whether `record` is another running instance of this program.
pub fn is_sibling(record: &ProcessRecord, me: &SelfIdentity) -> bool {
    if me.excluded.contains(&record.pid) {
        return false;
    }
    let Some(exe) = record.exe.as_deref() else {
        return false;
    };
    if normalize_exe_path(exe, me.platform) != me.exe {
        return false;
    }
    me.launched_as_program(&record.cmdline)
}

/// All descendants of `root`, parents before children.
pub fn descendants(records: &[ProcessRecord], root: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for record in records {
        if let Some(ppid) = record.ppid {
            if ppid != record.pid {
                children.entry(ppid).or_default().push(record.pid);
            }
        }
    }

    let mut out = Vec::new();
    let mut queue = vec![root];
    while let Some(pid) = queue.pop() {
        for &child in children.get(&pid).into_iter().flatten() {
            if child != root && !out.contains(&child) {
                out.push(child);
                queue.push(child);
            }
        }
    }
    out
}
