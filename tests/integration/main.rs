//! Integration tests for cmc

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// `cmc` isolated from the user's config and cache
    fn cmc(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("cmc");
        cmd.env("CMC_HOME", home.join("cmc-home"))
            .env("CMC_CONFIG", home.join("config.toml"))
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_project(dir: &Path, content: &str) {
        std::fs::write(dir.join("cmc.toml"), content).unwrap();
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("shared lint configuration"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cmc"));
    }

    #[test]
    fn config_path_follows_env() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("max_attempts = 10"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path()).args(["config", "init"]).assert().success();

        let written = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert!(written.contains("[lock]"));
    }

    #[test]
    fn invalid_user_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[lock\n").unwrap();

        cmc(temp.path())
            .args(["cache", "path"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_path_uses_cmc_home() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cmc-home"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached repositories"));
    }

    #[test]
    fn cache_list_json() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("cmc-home/cache/acme-std-0123456789ab");
        std::fs::create_dir_all(entry.join(".git")).unwrap();

        cmc(temp.path())
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\": \"acme-std-0123456789ab\""))
            .stdout(predicate::str::contains("\"last_synced\": null"));
    }

    #[test]
    fn cache_clear_with_yes() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("cmc-home/cache/acme-std-0123456789ab");
        std::fs::create_dir_all(entry.join(".git")).unwrap();

        cmc(temp.path())
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Removed 1 cached repository"));
        assert!(!entry.exists());
    }

    #[test]
    fn cache_clear_without_yes_keeps_entries() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("cmc-home/cache/acme-std-0123456789ab");
        std::fs::create_dir_all(&entry).unwrap();

        cmc(temp.path())
            .args(["cache", "clear"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Cache not cleared"));
        assert!(entry.exists());
    }

    #[test]
    fn cache_clear_empty() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["cache", "clear"])
            .assert()
            .success()
            .stderr(predicate::str::contains("No cached repositories to remove"));
    }

    #[test]
    fn inherit_rejects_malformed_reference() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["inherit", "github:acme"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid remote reference"));
        assert!(!temp.path().join("cmc-home").exists());
    }

    #[test]
    fn fetch_rejects_unsupported_host() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["fetch", "gitlab:acme/std/rulesets/ts@v1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid remote reference"));
    }

    #[test]
    fn fetch_rejects_unknown_kind() {
        let temp = TempDir::new().unwrap();
        cmc(temp.path())
            .args(["fetch", "github:acme/std/x@v1", "--kind", "themes"])
            .assert()
            .failure();
    }

    #[test]
    fn rules_without_project_config() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();

        cmc(temp.path())
            .args(["rules", "--project"])
            .arg(&project)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn rules_local_only() {
        let temp = TempDir::new().unwrap();
        write_project(
            temp.path(),
            "[rulesets.eslint.rules]\nno-var = \"error\"\n\n[rulesets.tsc]\nstrict = true\n",
        );

        cmc(temp.path())
            .args(["rules", "--project"])
            .arg(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"no-var\": \"error\""))
            .stdout(predicate::str::contains("\"strict\": true"));
    }

    #[test]
    fn rules_rejects_local_extends() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "[extends]\neslint = \"../base.toml\"\n");

        cmc(temp.path())
            .args(["rules", "--project"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("extends.eslint"));
    }

    #[test]
    fn prompts_without_templates() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "");

        cmc(temp.path())
            .args(["prompts", "--project"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("[prompts] templates"));
    }
}
