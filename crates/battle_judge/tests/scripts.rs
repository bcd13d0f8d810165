//! End-to-end script tests.

use std::io::Write;
use std::process::{Command, Stdio};

use battle_core::config::BattleConfig;
use battle_core::error::BattleError;
use battle_core::occupancy::OccupancyPolicy;
use battle_judge::error::{EXIT_MALFORMED, EXIT_TIME_VIOLATION, EXIT_UNSUPPORTED_KIND};
use battle_judge::{Judge, JudgeConfig, JudgeError, OutputFormat};
use battle_test_utils::fixtures::{ScriptBuilder, DUEL_EXPECTED, DUEL_SCRIPT};

fn judge(script: &str) -> (Result<battle_judge::RunSummary, JudgeError>, String) {
    judge_with(&Judge::new(), script)
}

fn judge_with(
    judge: &Judge,
    script: &str,
) -> (Result<battle_judge::RunSummary, JudgeError>, String) {
    let mut out = Vec::new();
    let result = judge.run(script.as_bytes(), &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn run_binary(args: &[&str], stdin: &str) -> (Option<i32>, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_battle-judge"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    (
        output.status.code(),
        String::from_utf8(output.stdout).unwrap(),
    )
}

#[test]
fn test_duel_scenario() {
    let (result, out) = judge(DUEL_SCRIPT);
    let summary = result.unwrap();
    assert_eq!(out, DUEL_EXPECTED);
    assert_eq!(summary.final_time, 3);
    assert_eq!(summary.units_alive, 2);
}

#[test]
fn test_spawn_reports_full_health_at_coordinate() {
    let script = ScriptBuilder::new(2, 3)
        .line(1, "spawn rifleman r 2 3; state")
        .build();
    let (result, out) = judge(&script);
    result.unwrap();
    assert_eq!(out, "r rifleman (2, 3) 10\n---\n");
}

#[test]
fn test_ignored_spawns_leave_snapshot_identical() {
    let script = ScriptBuilder::new(1, 2)
        .line(1, "spawn footman a 1 1; state")
        .line(
            2,
            "spawn knight b 1 1; spawn knight a 1 2; spawn knight Up 1 2; spawn knight c 3 3; state",
        )
        .build();
    let (result, out) = judge(&script);
    result.unwrap();
    let blocks: Vec<&str> = out.split_inclusive("---\n").collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0], blocks[1]);
}

#[test]
fn test_unknown_ids_and_directions_are_ignored() {
    let script = ScriptBuilder::new(1, 2)
        .line(1, "spawn footman a 1 1")
        .line(2, "move ghost 1 2; attack ghost right; attack a diagonal; state")
        .build();
    let (result, out) = judge(&script);
    result.unwrap();
    assert_eq!(out, "a footman (1, 1) 20\n---\n");
}

#[test]
fn test_time_violation_aborts_run() {
    let script = ScriptBuilder::new(1, 2)
        .line(1, "spawn footman a 1 1; state")
        .line(1, "move a 1 2; state")
        .line(5, "state")
        .build();
    let (result, out) = judge(&script);
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        JudgeError::Battle {
            line: 4,
            source: BattleError::NonIncreasingTime {
                current: 1,
                requested: 1
            }
        }
    ));
    assert_eq!(err.exit_code(), EXIT_TIME_VIOLATION);
    // Nothing after the violation ran.
    assert_eq!(out, "a footman (1, 1) 20\n---\n");
}

#[test]
fn test_unsupported_kind_is_fatal() {
    let script = ScriptBuilder::new(1, 1).line(1, "spawn wizard w 1 1").build();
    let (result, _) = judge(&script);
    assert_eq!(result.unwrap_err().exit_code(), EXIT_UNSUPPORTED_KIND);
}

#[test]
fn test_unknown_command_is_fatal() {
    let script = ScriptBuilder::new(1, 1)
        .line(1, "state; dance")
        .line(2, "state")
        .build();
    let (result, out) = judge(&script);
    assert_eq!(result.unwrap_err().exit_code(), EXIT_MALFORMED);
    // The snapshot before the bad word is kept; the next line never runs.
    assert_eq!(out, "---\n");
}

#[test]
fn test_penalty_kills_over_time() {
    let script = ScriptBuilder::new(1, 3)
        .line(1, "spawn rifleman r 1 1; spawn footman f 1 3")
        .line(2, "move r 1 3; state")
        .line(6, "state")
        .line(12, "state")
        .build();
    let (result, out) = judge(&script);
    result.unwrap();
    assert_eq!(
        out,
        "r rifleman (1, 1) 10\nf footman (1, 3) 20\n---\n\
         r rifleman (1, 1) 6\nf footman (1, 3) 20\n---\n\
         f footman (1, 3) 20\n---\n"
    );
}

#[test]
fn test_uphill_climb_limits() {
    // Knights climb one level per step; the wall of height 3 stops them.
    let script = ScriptBuilder::new(1, 4)
        .with_heights(vec![0, 1, 3, 3])
        .line(1, "spawn knight k 1 1; move k 1 2; state")
        .line(2, "move k 1 4; state")
        .build();
    let (result, out) = judge(&script);
    result.unwrap();
    assert_eq!(out, "k knight (1, 2) 50\n---\nk knight (1, 2) 50\n---\n");
}

#[test]
fn test_shared_policy_via_config_file() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(config, "(occupancy: shared)").unwrap();
    let battle = BattleConfig::load(config.path()).unwrap();
    assert_eq!(battle.occupancy, OccupancyPolicy::Shared);

    let judge = Judge::with_config(JudgeConfig {
        battle,
        format: OutputFormat::Text,
    });
    let script = ScriptBuilder::new(1, 2)
        .line(1, "spawn rifleman r 1 1; spawn footman b 1 2; state")
        .line(2, "spawn footman a 1 2; move r 1 2; attack r right; state")
        .build();
    let (result, out) = judge_with(&judge, &script);
    result.unwrap();
    let blocks: Vec<&str> = out.split_inclusive("---\n").collect();
    assert_eq!(blocks[0], "r rifleman (1, 1) 10\nb footman (1, 2) 20\n---\n");
    // Neither the spawn nor the move stacks onto b; the failed move costs r
    // nothing before the next tick.
    assert_eq!(blocks[1], "r rifleman (1, 1) 10\nb footman (1, 2) 17\n---\n");
}

#[test]
fn test_binary_prints_duel() {
    let (code, out) = run_binary(&["run"], DUEL_SCRIPT);
    assert_eq!(code, Some(0));
    assert_eq!(out, DUEL_EXPECTED);
}

#[test]
fn test_binary_exit_status_on_time_violation() {
    let script = ScriptBuilder::new(1, 1)
        .line(3, "state")
        .line(2, "state")
        .build();
    let (code, out) = run_binary(&["run"], &script);
    assert_eq!(code, Some(i32::from(EXIT_TIME_VIOLATION)));
    assert_eq!(out, "---\n");
}

#[test]
fn test_binary_verify() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    input.write_all(DUEL_SCRIPT.as_bytes()).unwrap();
    let path = input.path().to_str().unwrap();
    let (code, out) = run_binary(&["verify", "--input", path, "--runs", "3"], "");
    assert_eq!(code, Some(0));
    assert!(out.is_empty());
}
