use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Test helper for creating controlled test environments:
/// a config file plus a fake cpu sysfs tree
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub cores: usize,
}

#[allow(dead_code)]
impl TestEnvironment {
    /// Create a fake sysfs tree with `cores` cores, all on `powersave`
    pub fn new(cores: usize) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let sysfs = temp_dir.path().join("cpu");
        fs::create_dir_all(&sysfs)?;
        fs::write(sysfs.join("present"), format!("0-{}\n", cores - 1))?;
        for core in 0..cores {
            let dir = sysfs.join(format!("cpu{}/cpufreq", core));
            fs::create_dir_all(&dir)?;
            fs::write(dir.join("scaling_governor"), "powersave")?;
        }

        Ok(TestEnvironment { temp_dir, cores })
    }

    pub fn sysfs_root(&self) -> PathBuf {
        self.temp_dir.path().join("cpu")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("tuna.toml")
    }

    /// Write the config file and push its mtime forward so a running daemon sees the change
    pub fn write_config(&self, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.config_path();
        let previous = fs::metadata(&path).and_then(|m| m.modified()).ok();
        fs::write(&path, content)?;
        if let Some(previous) = previous {
            fs::File::options()
                .write(true)
                .open(&path)?
                .set_modified(previous + Duration::from_secs(5))?;
        }
        Ok(path)
    }

    pub fn governor(&self, core: usize) -> String {
        fs::read_to_string(self.sysfs_root().join(format!("cpu{}/cpufreq/scaling_governor", core)))
            .unwrap_or_default()
    }

    pub fn governors(&self) -> Vec<String> {
        (0..self.cores).map(|core| self.governor(core)).collect()
    }

    /// Spawn the daemon against this environment
    pub fn spawn_daemon(&self) -> anyhow::Result<Child> {
        let child = Command::new(tuna_binary())
            .arg(self.config_path())
            .env("TUNA_CPU_SYSFS", self.sysfs_root())
            .env("TUNA_LOG", "debug")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        Ok(child)
    }
}

#[allow(dead_code)]
pub fn tuna_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tuna"))
}

/// Poll `condition` until it holds or `timeout` passes
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[allow(dead_code)]
#[derive(Debug)]
pub struct TestResult {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

/// Send SIGINT (same as CTRL-C) and collect the output
#[allow(dead_code)]
pub fn interrupt_and_wait(mut child: Child, timeout: Duration) -> anyhow::Result<TestResult> {
    unsafe {
        libc::kill(child.id() as i32, libc::SIGINT);
    }

    let deadline = Instant::now() + timeout;
    while child.try_wait()?.is_none() {
        if Instant::now() >= deadline {
            let _ = child.kill();
            anyhow::bail!("daemon did not exit within {:?} of SIGINT", timeout);
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    let output = child.wait_with_output()?;
    Ok(TestResult {
        exit_code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
