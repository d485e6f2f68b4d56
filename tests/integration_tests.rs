use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

const ACREAGE_CSV: &str = "\
county,year,acres,parcels
Albany,2020,10.5,3
Kings,2020,4,
Albany,2021,2.5,1
Bronx,2021,,2
Kings,2021,6,5
";

/// Helper function to run graphcomp with arguments and CSV input
fn run_graphcomp(args: &[&str], csv_content: &str) -> Result<Vec<u8>, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_graphcomp"))
        .args(args)
        .env_remove("GRAPHCOMP_PG_ENV")
        .env_remove("GRAPHCOMP_CATEGORY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    // Write CSV to stdin
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(csv_content.as_bytes())
            .map_err(|e| format!("Failed to write to stdin: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

fn run_json(args: &[&str], csv_content: &str) -> serde_json::Value {
    let mut full = vec!["--output", "json"];
    full.extend_from_slice(args);
    let bytes = run_graphcomp(&full, csv_content).expect("graphcomp failed");
    serde_json::from_slice(&bytes).expect("output is not JSON")
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_end_to_end_bar_chart() {
    let result = run_graphcomp(&["-x", "county", "-y", "acres"], ACREAGE_CSV);
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    let png_bytes = result.unwrap();
    assert!(is_valid_png(&png_bytes), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_line_chart() {
    let result = run_graphcomp(
        &["-g", "line", "-x", "year", "-y", "acres:AVG", "-y", "parcels", "--rotate-labels"],
        ACREAGE_CSV,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_end_to_end_scale_colors() {
    let result = run_graphcomp(
        &["-x", "county", "-y", "acres", "--colors", "scale", "--scale", "quantile", "--no-grid"],
        ACREAGE_CSV,
    );
    assert!(result.is_ok(), "Failed: {:?}", result.err());
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_end_to_end_json_bar_series() {
    let value = run_json(&["-x", "county", "-y", "acres:SUM", "--sort", "asc", "-t", "Acres"], ACREAGE_CSV);
    assert_eq!(value["title"], "Acres");
    assert_eq!(value["series"]["keys"], serde_json::json!(["acres"]));
    let data = value["series"]["data"].as_array().unwrap();
    let indexes: Vec<&str> = data.iter().map(|r| r["index"].as_str().unwrap()).collect();
    assert_eq!(indexes, vec!["Albany", "Bronx", "Kings"]);
    assert_eq!(data[0]["acres"], 13.0);
    assert_eq!(data[1]["acres"], 0.0);
    assert_eq!(data[2]["acres"], 10.0);
    // Default palette, first color for the first key
    assert_eq!(data[0]["colors"]["acres"], "#8dd3c7");
}

#[test]
fn test_end_to_end_count_and_avg() {
    let value = run_json(&["-x", "county", "-y", "parcels:COUNT", "-y", "acres:AVG"], ACREAGE_CSV);
    let data = value["series"]["data"].as_array().unwrap();
    // Albany, Kings, Bronx in first-seen order
    assert_eq!(data[1]["index"], "Kings");
    assert_eq!(data[1]["parcels"], 1.0);
    assert_eq!(data[1]["acres"], 5.0);
    assert_eq!(data[2]["index"], "Bronx");
    assert!(data[2]["acres"].is_null());
}

#[test]
fn test_end_to_end_filter() {
    let value = run_json(&["-x", "county", "-y", "acres", "--filter", "year=2021"], ACREAGE_CSV);
    let data = value["series"]["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["acres"], 2.5);
}

#[test]
fn test_end_to_end_line_series() {
    let value = run_json(&["-g", "line", "-x", "year", "-y", "acres", "--scheme", "Set1"], ACREAGE_CSV);
    assert_eq!(value["graphType"]["type"], "Line Graph");
    let series = value["series"]["data"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["id"], "acres");
    assert_eq!(series[0]["color"], "#e41a1c");
    assert_eq!(series[0]["data"][0], serde_json::json!({"x": 2020.0, "y": 14.5}));
}

#[test]
fn test_end_to_end_threshold_requires_domain_order() {
    let result = run_graphcomp(
        &["-x", "county", "-y", "acres", "--colors", "scale", "--scale", "threshold", "--domain", "5,1"],
        ACREAGE_CSV,
    );
    assert!(result.is_err(), "Unsorted threshold domain should be rejected");
    assert!(result.unwrap_err().contains("ascending"));
}

#[test]
fn test_end_to_end_line_rejects_scale() {
    let result = run_graphcomp(&["-g", "line", "-x", "year", "-y", "acres", "--colors", "scale"], ACREAGE_CSV);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("does not support scale coloring"));
}

#[test]
fn test_end_to_end_column_not_found() {
    let result = run_graphcomp(&["-x", "missing", "-y", "acres"], ACREAGE_CSV);
    assert!(result.is_err(), "Should have failed with column not found");
    assert!(result.unwrap_err().contains("not found"));
}

#[test]
fn test_end_to_end_bad_aggregation() {
    let result = run_graphcomp(&["-x", "county", "-y", "acres:MEDIAN"], ACREAGE_CSV);
    assert!(result.is_err());
}

#[test]
fn test_end_to_end_empty_csv() {
    // No rows is an empty graph, not an error
    let value = run_json(&["-x", "x", "-y", "y"], "x,y\n");
    assert_eq!(value["series"]["data"], serde_json::json!([]));

    let result = run_graphcomp(&["-x", "x", "-y", "y"], "x,y\n");
    assert!(is_valid_png(&result.unwrap()));
}

#[test]
fn test_end_to_end_no_selection() {
    let value = run_json(&[], ACREAGE_CSV);
    assert_eq!(value["series"], serde_json::json!({"keys": [], "data": []}));
}

#[test]
fn test_end_to_end_wrong_category() {
    let result = run_graphcomp(&["--category", "Other", "-x", "county"], ACREAGE_CSV);
    // The stdin source is always tagged with the requested category
    assert!(result.is_ok(), "Failed: {:?}", result.err());
}

#[test]
fn test_end_to_end_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let path_str = path.to_str().unwrap();

    run_json(&["-x", "county", "-y", "acres", "-t", "Saved", "--save", path_str], ACREAGE_CSV);
    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["state"]["graphFormat"]["title"], "Saved");
    assert_eq!(saved["state"]["xAxisColumn"]["name"], "county");
    assert_eq!(saved["viewData"].as_array().unwrap().len(), 3);
    assert_eq!(saved["viewData"][0], serde_json::json!({"index": "Albany", "value": 13.0, "type": "acres"}));

    // Reloading brings the selection back without any column options
    let value = run_json(&["--state", path_str], ACREAGE_CSV);
    assert_eq!(value["title"], "Saved");
    assert_eq!(value["series"]["data"].as_array().unwrap().len(), 3);
}

#[test]
fn test_end_to_end_corrupt_state_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    fs::write(&path, "not json").unwrap();

    let value = run_json(&["--state", path.to_str().unwrap(), "-x", "county", "-y", "acres"], ACREAGE_CSV);
    assert_eq!(value["height"], 300);
    assert_eq!(value["series"]["data"].as_array().unwrap().len(), 3);
}

#[test]
fn test_end_to_end_list_schemes() {
    let bytes = run_graphcomp(&["--list-schemes", "9"], "").unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let qualitative = value["Qualitative"].as_array().unwrap();
    assert!(qualitative.iter().any(|r| r["name"] == "Set1"));
    assert_eq!(value["Diverging"][0]["colors"].as_array().unwrap().len(), 9);
}
