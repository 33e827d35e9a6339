//! End-to-end tests for the phaseline binary
//!
//! ## Exit Code Contract
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success |
//! | 1 | Fatal load error or invalid input |

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const EXPORT: &str = r#"[
    {"Projeto": "Portal do Servidor", "Dt Planejamento": "05/01/2026 → 30/01/2026",
     "Dt Execução": "02/02/2026 → 30/06/2026", "Status Projeto": "Em Andamento",
     "Diretoria": "DTI, DAF", "Assessoria | Núcleo | Programas": "Programa Digital"},
    {"Projeto": "Sala de Situação", "Dt Contratação": "01/03/2026 → 15/04/2026",
     "Status Projeto": "Atrasado", "Diretoria": "Gabinete"}
]"#;

fn phaseline_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_phaseline"))
}

/// Run the binary inside `dir` with a clean environment for source settings
fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(phaseline_binary())
        .current_dir(dir)
        .env_remove("PHASELINE_REMOTE_TOKEN")
        .env_remove("PHASELINE_DATABASE_ID")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to execute phaseline")
}

fn workspace_with_export() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("projects.json"), EXPORT).unwrap();
    dir
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// =============================================================================
// Success
// =============================================================================

#[test]
fn load_prints_bundle() {
    let dir = workspace_with_export();
    let output = run(dir.path(), &["load", "--csv-json", "projects.json"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let bundle: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(bundle["tasks"].as_array().unwrap().len(), 3);
    assert_eq!(bundle["metadata"]["source"], "csv-json");
    assert_eq!(bundle["metadata"]["projectCount"], 2);
}

#[test]
fn load_writes_output_file() {
    let dir = workspace_with_export();
    let output = run(
        dir.path(),
        &["load", "--csv-json", "projects.json", "-o", "bundle.json"],
    );
    assert_eq!(output.status.code(), Some(0));
    let written = std::fs::read_to_string(dir.path().join("bundle.json")).unwrap();
    assert!(written.contains("\"Portal do Servidor\""));
}

#[test]
fn tags_lists_distinct_values() {
    let dir = workspace_with_export();
    let output = run(dir.path(), &["tags", "org-unit", "--csv-json", "projects.json"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "DAF\nDTI\nGabinete\n");

    let output = run(
        dir.path(),
        &["tags", "program", "--json", "--csv-json", "projects.json"],
    );
    assert_eq!(stdout(&output).trim(), r#"["Programa Digital"]"#);
}

#[test]
fn chart_json_is_ordered_and_filtered() {
    let dir = workspace_with_export();
    let output = run(
        dir.path(),
        &[
            "chart",
            "--csv-json",
            "projects.json",
            "--today",
            "2026-01-10",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let view: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let phases: Vec<&str> = view["series"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["phase"].as_str().unwrap())
        .collect();
    assert_eq!(phases, vec!["Planejamento", "Execução", "Contratação"]);
    assert_eq!(view["stats"]["planningToday"], 1);

    let output = run(
        dir.path(),
        &[
            "chart",
            "--csv-json",
            "projects.json",
            "--org-unit",
            "gab",
            "--today",
            "2026-01-10",
        ],
    );
    let view: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(view["series"].as_array().unwrap().len(), 1);
    assert_eq!(view["stats"]["totalProjects"], 1);
}

#[test]
fn chart_mobile_and_text_formats() {
    let dir = workspace_with_export();
    let output = run(
        dir.path(),
        &[
            "chart",
            "--csv-json",
            "projects.json",
            "--mobile",
            "--format",
            "text",
            "--today",
            "2026-01-10",
        ],
    );
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("[DTI] Portal do Servidor"));
    assert!(text.contains("05/01/2026 - 30/01/2026"));
}

#[test]
fn stats_prints_cards() {
    let dir = workspace_with_export();
    let output = run(
        dir.path(),
        &["stats", "--csv-json", "projects.json", "--today", "2026-03-10"],
    );
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("Total de Projetos"));
    assert!(text.contains("Contratação Hoje"));
}

#[test]
fn config_file_supplies_sources() {
    let dir = workspace_with_export();
    std::fs::write(
        dir.path().join("phaseline.toml"),
        "[sources]\ncsv_json = \"projects.json\"\n[project]\nname = \"Portfólio\"\n",
    )
    .unwrap();
    let output = run(dir.path(), &["load"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let bundle: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(bundle["project"]["name"], "Portfólio");
}

#[test]
fn falls_back_to_bundle_source() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("cronograma.json"),
        r#"{"tasks": [{"id": 1, "name": "Kickoff", "phase": "Planejamento", "project": "P",
            "start": "2026-01-01", "end": "2026-01-05", "status": "completed"}]}"#,
    )
    .unwrap();
    let output = run(
        dir.path(),
        &["load", "--csv-json", "missing.json", "--data", "cronograma.json"],
    );
    assert_eq!(output.status.code(), Some(0));
    let bundle: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(bundle["metadata"]["source"], "json");
}

#[test]
fn parse_range_prints_iso_dates() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["parse-range", "01/03/2026 → 31/03/2026"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).trim(), "2026-03-01 → 2026-03-31");

    let output = run(dir.path(), &["parse-range", "31/04/2026 → 02/05/2026"]);
    assert_eq!(stdout(&output).trim(), "2026-05-01 → 2026-05-02");
}

// =============================================================================
// Failure
// =============================================================================

#[test]
fn exit_1_without_any_source() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["load"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("No data source configured"));
    assert!(err.contains("re-run"));
}

#[test]
fn exit_1_when_every_source_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &["stats", "--csv-json", "a.json", "--data", "b.json"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("All data sources failed"));
}

#[test]
fn exit_1_on_invalid_range() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["parse-range", "01/03/2026"]);
    assert_eq!(output.status.code(), Some(1));

    let output = run(dir.path(), &["parse-range", "--strict", "31/04/2026 → 02/05/2026"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn exit_1_on_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("phaseline.toml"), "[display\n").unwrap();
    let output = run(dir.path(), &["load", "--data", "x.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid configuration"));
}
