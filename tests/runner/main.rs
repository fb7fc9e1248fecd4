use overlap_cleaner::{
    engine::PipelineConfig,
    overlap::{OverlapTestConfig, OverlapTestRegistry},
    runner::{CleaningRunner, EventErrorPolicy, run_stream},
};
use serde_json::{Value, json};
use tokio::io::BufWriter;

fn runner() -> CleaningRunner {
    let muons = PipelineConfig::new("clean_muons", "muons").with_preselection("pt > 5");
    let jets = PipelineConfig::new("clean_jets", "jets").with_overlap_test(OverlapTestConfig::new(
        "muons",
        "byDeltaR",
        true,
        json!({ "src": "clean_muons", "delta_r": 0.4 }),
    ));
    CleaningRunner::from_pipelines(&[muons, jets], &OverlapTestRegistry::with_builtin())
        .expect("runner should build")
}

fn kinematic(pt: f64, eta: f64, phi: f64) -> Value {
    json!({ "attributes": { "pt": pt, "eta": eta, "phi": phi } })
}

fn event_line(id: u64) -> String {
    json!({
        "id": id,
        "collections": {
            "muons": [kinematic(20.0, 0.0, 0.0), kinematic(2.0, 1.5, 1.5)],
            "jets": [kinematic(50.0, 0.1, 0.1), kinematic(40.0, 1.5, 1.5)],
        }
    })
    .to_string()
}

fn output_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8(output.to_vec())
        .expect("output should be utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("output line should be json"))
        .collect()
}

#[tokio::test]
async fn later_pipelines_see_earlier_outputs() {
    let mut runner = runner();
    assert_eq!(runner.pipeline_names(), vec!["clean_muons", "clean_jets"]);

    let input = format!("{}\n\n{}\n", event_line(1), event_line(2));
    let mut output = Vec::new();
    let report = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut output,
        EventErrorPolicy::Abort,
        std::future::pending(),
    )
    .await
    .expect("stream should succeed");

    assert_eq!(report.events_read, 2);
    assert_eq!(report.events_written, 2);
    assert!(!report.interrupted);

    let lines = output_lines(&output);
    assert_eq!(lines[0]["event_id"], 1);
    assert_eq!(lines[1]["event_id"], 2);
    let collections = &lines[0]["collections"];
    assert_eq!(collections["clean_muons"].as_array().map(Vec::len), Some(1));
    let jets = collections["clean_jets"].as_array().expect("jets array");
    assert_eq!(jets.len(), 1, "the jet near the soft muon survives");
    assert_eq!(jets[0]["attributes"]["eta"], 1.5);
    assert_eq!(jets[0]["overlaps"]["muons"], json!([]));
    assert!(collections.get("muons").is_none(), "inputs are not echoed");
}

#[tokio::test]
async fn abort_policy_stops_at_failing_event() {
    let mut runner = runner();
    let broken = json!({ "id": 2, "collections": { "muons": [] } }).to_string();
    let input = format!("{}\n{}\n{}\n", event_line(1), broken, event_line(3));
    let mut output = Vec::new();

    let err = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut output,
        EventErrorPolicy::Abort,
        std::future::pending(),
    )
    .await
    .expect_err("missing jets should abort");

    assert!(format!("{err:#}").contains("jets"), "unexpected error: {err:#}");
    assert_eq!(output_lines(&output).len(), 1);
}

#[tokio::test]
async fn skip_policy_drops_only_failing_event() {
    let mut runner = runner();
    let broken = json!({ "id": 2, "collections": { "jets": [] } }).to_string();
    let input = format!("{}\n{}\n{}\n", event_line(1), broken, event_line(3));
    let mut output = Vec::new();

    let report = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut output,
        EventErrorPolicy::Skip,
        std::future::pending(),
    )
    .await
    .expect("skip policy should keep going");

    assert_eq!(report.events_read, 3);
    assert_eq!(report.events_written, 2);
    assert_eq!(report.events_skipped, 1);
    let ids: Vec<_> = output_lines(&output)
        .iter()
        .map(|line| line["event_id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(3)]);
}

#[tokio::test]
async fn malformed_line_always_aborts() {
    let mut runner = runner();
    let input = format!("{}\nnot json\n", event_line(1));
    let mut output = Vec::new();

    let err = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut output,
        EventErrorPolicy::Skip,
        std::future::pending(),
    )
    .await
    .expect_err("malformed input should abort");
    assert!(err.to_string().contains("line 2"), "unexpected error: {err}");
}

#[tokio::test]
async fn resolved_shutdown_stops_before_reading() {
    let mut runner = runner();
    let input = format!("{}\n", event_line(1));
    let mut output = Vec::new();

    let report = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut output,
        EventErrorPolicy::Abort,
        std::future::ready(()),
    )
    .await
    .expect("interrupted stream is not an error");

    assert!(report.interrupted);
    assert_eq!(report.events_read, 0);
    assert!(output.is_empty());
}

#[tokio::test]
async fn abort_on_failed_event_flushes_earlier_lines() {
    let mut runner = runner();
    let broken = json!({ "id": 2, "collections": { "muons": [] } }).to_string();
    let input = format!("{}\n{}\n", event_line(1), broken);
    let mut writer = BufWriter::new(Vec::new());

    run_stream(
        &mut runner,
        input.as_bytes(),
        &mut writer,
        EventErrorPolicy::Abort,
        std::future::pending(),
    )
    .await
    .expect_err("missing jets should abort");

    let lines = output_lines(writer.get_ref());
    assert_eq!(lines.len(), 1, "event 1 must reach the underlying writer");
    assert_eq!(lines[0]["event_id"], 1);
}

#[tokio::test]
async fn abort_on_malformed_line_flushes_earlier_lines() {
    let mut runner = runner();
    let input = format!("{}\n{}\n{{\n", event_line(1), event_line(2));
    let mut writer = BufWriter::new(Vec::new());

    let err = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut writer,
        EventErrorPolicy::Skip,
        std::future::pending(),
    )
    .await
    .expect_err("malformed input should abort");

    assert!(err.to_string().contains("line 3"), "unexpected error: {err}");
    let ids: Vec<_> = output_lines(writer.get_ref())
        .iter()
        .map(|line| line["event_id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn shutdown_after_first_event_flushes_its_line() {
    let mut runner = runner();
    let input = format!("{}\n{}\n", event_line(1), event_line(2));
    let mut writer = BufWriter::new(Vec::new());

    // Pending on the first poll, ready on the next: one event gets through.
    let report = run_stream(
        &mut runner,
        input.as_bytes(),
        &mut writer,
        EventErrorPolicy::Abort,
        tokio::task::yield_now(),
    )
    .await
    .expect("interrupted stream is not an error");

    assert!(report.interrupted);
    assert_eq!(report.events_written, 1);
    let lines = output_lines(writer.get_ref());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event_id"], 1);
}

#[test]
fn duplicate_pipeline_names_are_rejected() {
    let pipelines = [
        PipelineConfig::new("clean", "jets"),
        PipelineConfig::new("clean", "muons"),
    ];
    let err = CleaningRunner::from_pipelines(&pipelines, &OverlapTestRegistry::with_builtin())
        .err()
        .expect("duplicate names should fail");
    assert!(err.is_configuration());
}
