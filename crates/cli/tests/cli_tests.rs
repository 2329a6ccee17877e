// Integration tests for the `sabana` binary.
// Run with: cargo test -p sabana-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn sabana() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sabana"));
    cmd.env_remove("SABANA_PROFILE");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    sabana().args(args).output().expect("run sabana")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

const SUSPECT: &str = "\
Origen;Destino;Fecha;Hora;Lat;Lon;Celda
3001112222;3105556666;2024-03-01;23:45:10;4,6097;-74,0817;C1
3001112222;3105556666;2024-03-02;01:05:00;4,6097;-74,0817;C1
3001112222;3207778888;2024-03-02;14:00:00;6,2442;-75,5812;C2
3001112222;nan;2024-03-03;05:59:59;;;C3
";

const VICTIM: &str = "\
numero_a,numero_b,latitud,longitud
3207778888,3011234567,0,0
3109990000,3011234567,6.24421,-75.58118
";

// ---------------------------------------------------------------------------
// view
// ---------------------------------------------------------------------------

#[test]
fn overview_prints_table_and_summary() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["view", p(&file)]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("linea_a"), "{text}");
    assert!(text.contains("DESCONOCIDO"));
    assert!(stderr(&out).contains("Vista General: 4 of 4 rows (sabana.csv)"));
}

#[test]
fn overnight_json() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["view", p(&file), "--mode", "overnight", "--json"]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("valid JSON");
    assert_eq!(doc["title"], "Pernocta (23:00-06:00)");
    assert_eq!(doc["status"], "applied");
    assert_eq!(doc["row_count"], 3);
    assert_eq!(doc["source"], "sabana.csv");
    let hora = doc["columns"].as_array().unwrap().iter().position(|c| c == "hora").unwrap();
    assert_eq!(doc["rows"][2][hora], "05:59:59");
}

#[test]
fn towers_ranking_counts() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["view", p(&file), "--mode", "towers", "--json"]);

    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["columns"], serde_json::json!(["latitud", "longitud", "repeticiones"]));
    assert_eq!(doc["rows"][0], serde_json::json!([4.6097, -74.0817, 2]));
    assert_eq!(doc["rows"][1][2], 1);
}

#[test]
fn empty_search_is_a_hint_not_an_error() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["view", p(&file), "--mode", "search", "--json"]);

    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("hint:"));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["status"], "awaiting_input");
    assert_eq!(doc["row_count"], 4);
}

#[test]
fn search_either_column() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["view", p(&file), "--mode", "search", "-q", "7778", "--target", "either", "--json"]);

    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["title"], "Búsqueda Específica: 7778");
    assert_eq!(doc["row_count"], 1);
}

#[test]
fn missing_hora_degrades_with_warning() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "victima.csv", VICTIM);
    let out = run(&["view", p(&file), "--mode", "overnight", "--json"]);

    assert!(out.status.success());
    assert!(stderr(&out).contains("needs column(s) hora"));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["status"], "unavailable");
    assert_eq!(doc["missing"], serde_json::json!(["hora"]));
    assert_eq!(doc["row_count"], 2);
}

#[test]
fn row_limit_truncates_text_output() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["view", p(&file), "--rows", "1"]);

    assert!(out.status.success());
    assert!(stdout(&out).contains("... 3 more rows"));
}

// ---------------------------------------------------------------------------
// cross
// ---------------------------------------------------------------------------

#[test]
fn cross_by_number() {
    let dir = TempDir::new().unwrap();
    let suspect = write(&dir, "sospechoso.csv", SUSPECT);
    let victim = write(&dir, "victima.csv", VICTIM);
    let out = run(&["cross", p(&suspect), p(&victim), "--json"]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["title"], "Cruce por Número");
    assert_eq!(doc["status"], "matched");
    assert_eq!(doc["shared"], 1);
    assert_eq!(doc["row_count"], 1);
    assert!(stderr(&out).contains("1 shared identities with victima.csv"));
}

#[test]
fn cross_by_location_skips_zero_coordinates() {
    let dir = TempDir::new().unwrap();
    let suspect = write(&dir, "sospechoso.csv", SUSPECT);
    let victim = write(&dir, "victima.csv", VICTIM);
    let out = run(&["cross", p(&suspect), p(&victim), "--by", "location", "--json"]);

    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["shared"], 1);
    assert_eq!(doc["row_count"], 1);
}

#[test]
fn cross_without_line_columns_exits_4() {
    let dir = TempDir::new().unwrap();
    let suspect = write(&dir, "sospechoso.csv", SUSPECT);
    let other = write(&dir, "otro.csv", "foo,bar\n1,2\n");
    let out = run(&["cross", p(&suspect), p(&other)]);

    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("secondary table: missing column"));
}

// ---------------------------------------------------------------------------
// outputs
// ---------------------------------------------------------------------------

#[test]
fn export_xlsx_and_read_back() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let xlsx = dir.path().join("pernocta.xlsx");
    let out = run(&["view", p(&file), "--mode", "overnight", "--out", p(&xlsx)]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let table = sabana_io::load_table(&xlsx).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.columns()[0], "linea_a");
}

#[test]
fn map_is_written() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let html = dir.path().join("mapa.html");
    let out = run(&["view", p(&file), "--map", p(&html)]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let page = fs::read_to_string(&html).unwrap();
    assert!(page.contains("markerClusterGroup"));
    assert_eq!(page.matches(r#""lat":"#).count(), 3);
}

#[test]
fn map_without_coordinates_exits_6() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", "linea_a,linea_b\n300,400\n");
    let html = dir.path().join("mapa.html");
    let out = run(&["view", p(&file), "--map", p(&html)]);

    assert_eq!(out.status.code(), Some(6));
    assert!(!html.exists());
}

#[test]
fn map_title_follows_scope() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);

    let current = dir.path().join("pernocta.html");
    let out = run(&["view", p(&file), "--mode", "overnight", "--map", p(&current)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let page = fs::read_to_string(&current).unwrap();
    assert!(page.contains("<title>Mapa: Pernocta (23:00-06:00)</title>"));
    assert_eq!(page.matches(r#""lat":"#).count(), 2);

    let full = dir.path().join("total.html");
    let out = run(&["view", p(&file), "--mode", "overnight", "--map", p(&full), "--map-scope", "full"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let page = fs::read_to_string(&full).unwrap();
    assert!(page.contains("<title>Mapa: Registros Totales</title>"));
    assert_eq!(page.matches(r#""lat":"#).count(), 3);
}

#[test]
fn map_hint_names_missing_coordinate_columns() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", "linea_a,linea_b\n300,400\n");
    let out = run(&["view", p(&file), "--map", p(&dir.path().join("mapa.html"))]);
    assert_eq!(out.status.code(), Some(6));
    assert!(stderr(&out).contains("no latitud/longitud columns"));
}

#[test]
fn unsupported_output_extension_exits_5() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let target = dir.path().join("resultado.pdf");
    let out = run(&["view", p(&file), "--out", p(&target)]);

    assert_eq!(out.status.code(), Some(5));
}

// ---------------------------------------------------------------------------
// errors and configuration
// ---------------------------------------------------------------------------

#[test]
fn missing_file_exits_3() {
    let out = run(&["view", "/nonexistent/sabana.csv"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("cannot read 'sabana.csv'"));
}

#[test]
fn bad_arguments_exit_2() {
    let out = run(&["view", "x.csv", "--mode", "sideways"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn profile_changes_window_and_aliases() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", "abonado,destino,hora\n300,400,22:30:00\n300,401,12:00:00\n");
    let profile = write(
        &dir,
        "perfil.toml",
        "[aliases]\nlinea_a = [\"abonado\"]\n\n[overnight]\nstart = \"22:00:00\"\nend = \"05:00:00\"\n",
    );
    let out = sabana()
        .args(["view", p(&file), "--mode", "overnight", "--json"])
        .env("SABANA_PROFILE", p(&profile))
        .output()
        .unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["title"], "Pernocta (22:00-05:00)");
    assert_eq!(doc["row_count"], 1);
    assert_eq!(doc["columns"][0], "linea_a");
}

#[test]
fn invalid_profile_exits_7() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let profile = write(&dir, "perfil.toml", "[ranking]\ntowers = 0\n");
    let out = run(&["view", p(&file), "--profile", p(&profile)]);

    assert_eq!(out.status.code(), Some(7));
    assert!(stderr(&out).contains("ranking.towers"));
}

#[test]
fn columns_report() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["columns", p(&file), "--json"]);

    assert!(out.status.success());
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["rows"], 4);
    assert_eq!(doc["report"]["unmapped"], serde_json::json!(["Celda"]));
    assert_eq!(doc["report"]["lines_unknown"], 1);
    assert_eq!(doc["report"]["mapped"][0], serde_json::json!({"field": "linea_a", "column": "Origen"}));
}

#[test]
fn verbose_logs_normalization() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sabana.csv", SUSPECT);
    let out = run(&["-v", "columns", p(&file)]);

    assert!(out.status.success());
    assert!(stderr(&out).contains("normalized 4 rows"));
}
