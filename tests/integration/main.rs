//! Integration tests for revcache

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::path::Path;
use tempfile::TempDir;

/// A command isolated from the user's config, storage and remote
fn revcache(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("revcache");
    cmd.env("REVCACHE_CONFIG", home.join("config.toml"))
        .env("REVCACHE_DIR", home.join("store"))
        .env_remove("REVCACHE_URL")
        .env("CI", "1");
    cmd
}

mod cli_tests {
    use super::*;
    use predicates::prelude::*;

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Resolve prebuilt artifact caches"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("revcache"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains(r#"fallback = "show""#));
    }

    #[test]
    fn config_init_then_set() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(home.path().join("config.toml").is_file());

        revcache(home.path())
            .args(["config", "set", "cache.fallback", "download-all"])
            .assert()
            .success();
        revcache(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"fallback = "download-all""#));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn malformed_config_fails() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("config.toml"), "[cache\n").unwrap();
        revcache(home.path())
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn list_empty() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn get_outside_repository_fails() {
        if !git_available() {
            return;
        }
        let home = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        revcache(home.path())
            .args(["get", "-C"])
            .arg(elsewhere.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn unknown_fallback_rejected() {
        let home = TempDir::new().unwrap();
        revcache(home.path())
            .args(["get", "--fallback", "sometimes"])
            .assert()
            .failure();
    }
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A linear git history `c1 <- c2 <- c3` in a temp dir
struct Repo {
    dir: TempDir,
    commits: Vec<String>,
}

impl Repo {
    fn new() -> Self {
        let mut repo = Self {
            dir: TempDir::new().unwrap(),
            commits: Vec::new(),
        };
        repo.git(&["init", "-q"]);
        for msg in ["c1", "c2", "c3"] {
            repo.git(&["commit", "-q", "--allow-empty", "-m", msg]);
            let head = repo.git(&["rev-parse", "HEAD"]);
            repo.commits.push(head);
        }
        repo
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .current_dir(self.dir.path())
            .args(["-c", "user.name=revcache", "-c", "user.email=revcache@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }
}

mod end_to_end {
    use super::*;
    use predicates::prelude::*;
    use std::fs;

    /// Mirror directory holding archives for the given revisions
    fn mirror(revs: &[&str]) -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        for rev in revs {
            fs::write(dir.path().join(format!("{rev}.tar.xz")), rev.as_bytes()).unwrap();
        }
        let url = format!("file://{}", dir.path().display());
        (dir, url)
    }

    #[test]
    fn exact_archive_is_downloaded() {
        if !git_available() {
            return;
        }
        let repo = Repo::new();
        let home = TempDir::new().unwrap();
        let head = repo.commits[2].clone();
        let (_mirror, url) = mirror(&[head.as_str()]);

        let expected = home.path().join("store").join(format!("{head}.tar.xz"));
        revcache(home.path())
            .args(["get", "--url", url.as_str(), "-C"])
            .arg(repo.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(expected.display().to_string()));
        assert_eq!(fs::read(&expected).unwrap(), head.as_bytes());
    }

    #[test]
    fn show_reports_ancestor_with_pin_hint() {
        if !git_available() {
            return;
        }
        let repo = Repo::new();
        let home = TempDir::new().unwrap();
        let first = repo.commits[0].clone();
        let (_mirror, url) = mirror(&[first.as_str()]);

        revcache(home.path())
            .args(["get", "--fallback", "show", "--url", url.as_str(), "-C"])
            .arg(repo.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains(first.as_str()))
            .stderr(predicate::str::contains("Hint:"));
        assert!(!home.path().join("store").join(format!("{first}.tar.xz")).exists());
    }

    #[test]
    fn download_first_uses_closest_ancestor() {
        if !git_available() {
            return;
        }
        let repo = Repo::new();
        let home = TempDir::new().unwrap();
        let (first, second) = (repo.commits[0].clone(), repo.commits[1].clone());
        let (_mirror, url) = mirror(&[first.as_str(), second.as_str()]);

        revcache(home.path())
            .args(["get", "--fallback", "download-first", "--url", url.as_str(), "-C"])
            .arg(repo.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("{second}.tar.xz")));

        let store = home.path().join("store");
        assert!(store.join(format!("{second}.tar.xz")).is_file());
        assert!(!store.join(format!("{first}.tar.xz")).exists());
    }

    #[test]
    fn stored_archive_is_found_without_remote() {
        if !git_available() {
            return;
        }
        let repo = Repo::new();
        let home = TempDir::new().unwrap();
        let build = home.path().join("build.tar.xz");
        fs::write(&build, b"built locally").unwrap();

        revcache(home.path())
            .args(["store", "-C"])
            .arg(repo.path())
            .arg(&build)
            .assert()
            .success();

        let head = repo.commits[2].clone();
        revcache(home.path())
            .args(["get", "--fallback", "none", "-C"])
            .arg(repo.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("{head}.tar.xz")));

        revcache(home.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(head.as_str()));
    }

    #[test]
    fn nothing_cached_fails() {
        if !git_available() {
            return;
        }
        let repo = Repo::new();
        let home = TempDir::new().unwrap();

        revcache(home.path())
            .args(["get", "--fallback", "download-all", "-C"])
            .arg(repo.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("no archives available"));
    }
}
