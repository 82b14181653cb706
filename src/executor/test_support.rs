//! Fake container runtime and test command for executor tests.
//!
//! Both are small shell scripts that append their arguments to a log file, so
//! tests can assert exactly which runtime and test commands were issued.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use crate::config::RunConfig;

pub(crate) struct FakeEnv {
    dir: TempDir,
    runtime: PathBuf,
    test_script: PathBuf,
    runtime_log: PathBuf,
    test_log: PathBuf,
}

impl FakeEnv {
    pub(crate) fn new() -> Self {
        Self::with_failing_start(&[])
    }

    /// `<runtime> run` fails for the listed container names, half a second
    /// after being called so sibling batches are already running
    pub(crate) fn with_failing_start(names: &[&str]) -> Self {
        let dir = tempdir().unwrap();
        let runtime = dir.path().join("fake-runtime");
        let test_script = dir.path().join("fake-test.sh");
        let runtime_log = dir.path().join("runtime.log");
        let test_log = dir.path().join("tests.log");

        let failing = names
            .iter()
            .map(|name| {
                format!("    {name}) sleep 0.5; echo \"port is already allocated\" >&2; exit 125 ;;\n")
            })
            .collect::<String>();

        let runtime_script = format!(
            "#!/bin/sh\n\
             echo \"$*\" >> \"{log}\"\n\
             if [ \"$1\" = run ]; then\n\
             \x20 case \"$3\" in\n\
             {failing}\
             \x20 esac\n\
             \x20 echo \"container-$3\"\n\
             fi\n\
             exit 0\n",
            log = runtime_log.display(),
        );
        fs::write(&runtime, runtime_script).unwrap();
        fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();

        let test = format!(
            "echo \"$POSTGRES_HOST $POSTGRES_PORT $POSTGRES_USER $POSTGRES_DB $1\" >> \"{log}\"\n\
             case \"$1\" in\n\
             \x20 *slow*) sleep 2 ;;\n\
             esac\n\
             case \"$1\" in\n\
             \x20 *fail*) exit 1 ;;\n\
             esac\n\
             exit 0\n",
            log = test_log.display(),
        );
        fs::write(&test_script, test).unwrap();

        Self {
            dir,
            runtime,
            test_script,
            runtime_log,
            test_log,
        }
    }

    /// Directory for test trees, separate from the scripts and logs
    pub(crate) fn tree(&self) -> PathBuf {
        let root = self.dir.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        root
    }

    pub(crate) fn touch(&self, relative: &str) -> PathBuf {
        let path = self.tree().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "").unwrap();
        path
    }

    pub(crate) fn config(&self, root: &Path, batch_size: usize) -> RunConfig {
        let mut config = RunConfig {
            root_path: root.to_path_buf(),
            batch_size,
            test_command: format!("sh {}", self.test_script.display()),
            warmup_secs: 0,
            ..Default::default()
        };
        config.container.runtime = self.runtime.display().to_string();
        config
    }

    pub(crate) fn runtime_calls(&self) -> Vec<String> {
        read_lines(&self.runtime_log)
    }

    pub(crate) fn test_calls(&self) -> Vec<String> {
        read_lines(&self.test_log)
    }

    /// Number of runtime invocations equal to `call`
    pub(crate) fn count(&self, call: &str) -> usize {
        self.runtime_calls().iter().filter(|line| *line == call).count()
    }

    /// Names of containers passed to `<runtime> run`
    pub(crate) fn started(&self) -> Vec<String> {
        self.runtime_calls()
            .iter()
            .filter_map(|line| line.strip_prefix("run --name "))
            .filter_map(|rest| rest.split_whitespace().next())
            .map(str::to_string)
            .collect()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
