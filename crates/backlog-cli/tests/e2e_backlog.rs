//! E2E CLI tests: each test runs `bl` as a subprocess in an isolated temp
//! directory and inspects its JSON output.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn bl_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bl"));
    cmd.current_dir(dir);
    cmd.env("BACKLOG_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

/// Run a command with `--json`, assert success, and parse stdout.
fn bl_json(dir: &Path, args: &[&str]) -> Value {
    let output = bl_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("bl should not crash");
    assert!(
        output.status.success(),
        "bl {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

/// Run a command with `--json` that must fail; return the error object.
fn bl_json_err(dir: &Path, args: &[&str]) -> Value {
    let output = bl_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("bl should not crash");
    assert!(!output.status.success(), "bl {args:?} unexpectedly succeeded");
    let json: Value = serde_json::from_slice(&output.stderr).expect("valid JSON on stderr");
    json["error"].clone()
}

fn id_of(value: &Value) -> String {
    value["id"].as_i64().expect("numeric id").to_string()
}

/// An initialized backlog with one project, one sprint, and five stories.
struct Board {
    dir: TempDir,
    project: String,
    sprint: String,
    stories: Vec<String>,
}

impl Board {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        bl_cmd(dir.path()).arg("init").assert().success();
        let project = id_of(&bl_json(dir.path(), &["project", "add", "Platform"]));
        let sprint = id_of(&bl_json(
            dir.path(),
            &["sprint", "add", "Sprint 1", "--project", &project],
        ));
        let stories = (1..=5)
            .map(|n| {
                id_of(&bl_json(
                    dir.path(),
                    &[
                        "create",
                        "--project",
                        &project,
                        "--type",
                        "1",
                        "--sprint",
                        &sprint,
                        "--subject",
                        &format!("Story {n}"),
                    ],
                ))
            })
            .collect();
        Self {
            dir,
            project,
            sprint,
            stories,
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Item ids of one sprint, in listed order.
    fn sprint_order(&self, sprint: &str) -> Vec<String> {
        let listings = bl_json(
            self.path(),
            &["list", "--project", &self.project, "--sprint", sprint],
        );
        listings[0]["items"]
            .as_array()
            .expect("items")
            .iter()
            .map(id_of)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_store() {
    let dir = TempDir::new().expect("tempdir");
    bl_cmd(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized .backlog/"));
    assert!(dir.path().join(".backlog/config.toml").exists());
    assert!(dir.path().join(".backlog/backlog.db").exists());
}

#[test]
fn commands_before_init_report_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    let err = bl_json_err(dir.path(), &["project", "list"]);
    assert_eq!(err["error_code"], "E1001");
}

#[test]
fn text_errors_carry_code_and_suggestion() {
    let dir = TempDir::new().expect("tempdir");
    bl_cmd(dir.path())
        .args(["--format", "text", "project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"))
        .stderr(predicate::str::contains("bl init"));
}

#[test]
fn stories_are_numbered_on_create() {
    let board = Board::new();
    let listing = bl_json(
        board.path(),
        &["list", "--project", &board.project, "--sprint", &board.sprint],
    );
    let positions: Vec<i64> = listing[0]["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["position"].as_i64().expect("position"))
        .collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

#[test]
fn reorder_places_after_predecessor() {
    let board = Board::new();
    let s = &board.stories;
    let order = [&s[0], &s[1], &s[3], &s[2], &s[4]]
        .map(String::as_str)
        .join(",");

    let outcome = bl_json(
        board.path(),
        &[
            "reorder",
            "--project",
            &board.project,
            "--dropped",
            &s[2],
            "--order",
            &order,
        ],
    );
    assert_eq!(outcome["position"], 4);
    assert_eq!(
        board.sprint_order(&board.sprint),
        vec![s[0].clone(), s[1].clone(), s[3].clone(), s[2].clone(), s[4].clone()]
    );
}

#[test]
fn reorder_with_moveto_transfers_scope() {
    let board = Board::new();
    let s = &board.stories;
    let sprint_2 = id_of(&bl_json(
        board.path(),
        &["sprint", "add", "Sprint 2", "--project", &board.project],
    ));

    let outcome = bl_json(
        board.path(),
        &[
            "reorder",
            "--project",
            &board.project,
            "--dropped",
            &s[1],
            "--order",
            &s[1],
            "--moveto",
            &sprint_2,
        ],
    );
    assert_eq!(outcome["position"], 1);
    assert!(outcome["transferred_from"].is_object());
    assert_eq!(board.sprint_order(&sprint_2), vec![s[1].clone()]);
    assert_eq!(board.sprint_order(&board.sprint).len(), 4);
    bl_cmd(board.path())
        .args(["check", "--project", &board.project])
        .assert()
        .success();
}

#[test]
fn reorder_without_dropped_in_order_is_invalid() {
    let board = Board::new();
    let s = &board.stories;
    let order = format!("{},{}", s[0], s[1]);
    let err = bl_json_err(
        board.path(),
        &[
            "reorder",
            "--project",
            &board.project,
            "--dropped",
            &s[4],
            "--order",
            &order,
        ],
    );
    assert_eq!(err["error_code"], "E2001");
    assert_eq!(board.sprint_order(&board.sprint), board.stories);
}

#[test]
fn reorder_into_unknown_sprint_is_not_found() {
    let board = Board::new();
    let s = &board.stories;
    let err = bl_json_err(
        board.path(),
        &[
            "reorder",
            "--project",
            &board.project,
            "--dropped",
            &s[0],
            "--order",
            &s[0],
            "--moveto",
            "999",
        ],
    );
    assert_eq!(err["error_code"], "E2004");
}

#[test]
fn reorder_with_garbage_id_is_invalid() {
    let board = Board::new();
    let err = bl_json_err(
        board.path(),
        &[
            "reorder",
            "--project",
            &board.project,
            "--dropped",
            "abc",
            "--order",
            "abc",
        ],
    );
    assert_eq!(err["error_code"], "E2001");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn update_out_of_sprint_closes_gap() {
    let board = Board::new();
    let s = &board.stories;
    let item = bl_json(board.path(), &["update", &s[2], "--no-sprint"]);
    assert_eq!(item["sprint_id"], Value::Null);
    assert_eq!(item["position"], 1);
    assert_eq!(
        board.sprint_order(&board.sprint),
        vec![s[0].clone(), s[1].clone(), s[3].clone(), s[4].clone()]
    );
}

#[test]
fn retype_to_task_drops_position() {
    let board = Board::new();
    let item = bl_json(board.path(), &["update", &board.stories[0], "--type", "3"]);
    assert_eq!(item["position"], Value::Null);
    assert_eq!(board.sprint_order(&board.sprint).len(), 4);
}

#[test]
fn delete_and_check_stay_consistent() {
    let board = Board::new();
    bl_json(board.path(), &["delete", &board.stories[1]]);
    let report = bl_json(board.path(), &["check", "--project", &board.project]);
    assert_eq!(report["ok"], true);
    assert_eq!(board.sprint_order(&board.sprint).len(), 4);
}

#[test]
fn move_project_to_project_without_backlogs() {
    let board = Board::new();
    let ops = id_of(&bl_json(board.path(), &["project", "add", "Ops", "--no-backlogs"]));
    let item = bl_json(
        board.path(),
        &["move-project", &board.stories[0], "--to", &ops],
    );
    assert_eq!(item["position"], Value::Null);
    assert_eq!(item["sprint_id"], Value::Null);
    assert_eq!(board.sprint_order(&board.sprint).len(), 4);
}

#[test]
fn create_in_unshared_sprint_is_forbidden() {
    let board = Board::new();
    let other = id_of(&bl_json(board.path(), &["project", "add", "Other"]));
    let err = bl_json_err(
        board.path(),
        &[
            "create",
            "--project",
            &other,
            "--type",
            "1",
            "--sprint",
            &board.sprint,
            "--subject",
            "nope",
        ],
    );
    assert_eq!(err["error_code"], "E2005");
}

#[test]
fn disable_and_enable_backlogs_round_trip() {
    let board = Board::new();
    let report = bl_json(
        board.path(),
        &["project", "disable-backlogs", &board.project],
    );
    assert_eq!(report["cleared"], 5);
    assert!(board.sprint_order(&board.sprint).is_empty());

    let report = bl_json(
        board.path(),
        &["project", "enable-backlogs", &board.project],
    );
    assert_eq!(report["renumbered"], 5);
    assert_eq!(board.sprint_order(&board.sprint), board.stories);
}

#[test]
fn rebuild_reports_nothing_to_do_on_clean_store() {
    let board = Board::new();
    let report = bl_json(
        board.path(),
        &["rebuild-positions", "--project", &board.project],
    );
    assert_eq!(report["renumbered"], 0);
    assert_eq!(report["cleared"], 0);
    assert_eq!(report["scopes"], 1);
}
