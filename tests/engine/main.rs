use std::sync::{Arc, Mutex};

use overlap_cleaner::{
    engine::{CleaningEngine, PipelineConfig},
    event::{Cleanable, CollectingSink, Event, ObjectRef, PhysicsObject},
    overlap::{
        OverlapTestConfig, OverlapTestRegistry,
        testing::{CallLog, OverlapCall, evaluated_ids, scripted, scripted_registry},
    },
};

fn object(id: f64, pt: f64) -> PhysicsObject {
    PhysicsObject::kinematic(pt, 0.0, 0.0).with_attribute("id", id)
}

fn ids(objects: &[PhysicsObject]) -> Vec<f64> {
    objects.iter().map(|object| object.attributes["id"]).collect()
}

fn engine(config: &PipelineConfig, log: &CallLog) -> CleaningEngine<PhysicsObject> {
    CleaningEngine::from_config(config, &scripted_registry(Arc::clone(log)))
        .expect("engine should build")
}

#[test]
fn preselected_then_overlap_rejected_keeps_first_object_only() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in")
        .with_preselection("id != 2")
        .with_overlap_test(scripted("x", true, &[3.0]));
    let mut engine = engine(&config, &log);

    let event = Event::new(1).with_collection(
        "in",
        vec![object(1.0, 10.0), object(2.0, 10.0), object(3.0, 10.0)],
    );
    let outcome = engine.clean(&event).expect("event should clean");

    assert_eq!(ids(&outcome.objects), vec![1.0]);
    assert_eq!(outcome.objects[0].overlaps("x"), Some(&[][..]));
    assert_eq!(outcome.summary.input, 3);
    assert_eq!(outcome.summary.preselected, 2);
    assert_eq!(outcome.summary.rejected_by_overlap, 1);
    assert_eq!(outcome.summary.accepted, 1);
}

#[test]
fn rejecting_test_stops_later_tests() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in")
        .with_overlap_test(scripted("x", false, &[1.0]))
        .with_overlap_test(scripted("y", true, &[1.0]))
        .with_overlap_test(scripted("z", true, &[]));
    let mut engine = engine(&config, &log);

    let event = Event::new(1).with_collection("in", vec![object(1.0, 10.0), object(2.0, 10.0)]);
    let outcome = engine.clean(&event).expect("event should clean");

    assert_eq!(ids(&outcome.objects), vec![2.0]);
    assert_eq!(evaluated_ids(&log, "x"), vec![1.0, 2.0]);
    assert_eq!(evaluated_ids(&log, "y"), vec![1.0, 2.0]);
    assert_eq!(evaluated_ids(&log, "z"), vec![2.0], "z must not see the rejected object");
}

#[test]
fn surviving_objects_carry_one_annotation_per_test() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in")
        .with_overlap_test(scripted("x", false, &[1.0]))
        .with_overlap_test(scripted("y", false, &[]));
    let mut engine = engine(&config, &log);

    let event = Event::new(1).with_collection("in", vec![object(1.0, 10.0), object(2.0, 10.0)]);
    let outcome = engine.clean(&event).expect("event should clean");

    for cleaned in &outcome.objects {
        assert_eq!(
            cleaned.overlaps.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["x", "y"]
        );
    }
    assert_eq!(
        outcome.objects[0].overlaps("x"),
        Some(&[ObjectRef::new("scripted", 1)][..])
    );
    assert_eq!(outcome.objects[1].overlaps("x"), Some(&[][..]));
}

#[test]
fn inherited_annotations_are_replaced_by_configured_tests() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in").with_overlap_test(scripted("x", false, &[]));
    let mut engine = engine(&config, &log);

    let mut upstream = object(1.0, 10.0);
    upstream.set_overlaps("stale", vec![ObjectRef::new("jets", 0)]);
    upstream.set_overlaps("x", vec![ObjectRef::new("jets", 1)]);
    let event = Event::new(1).with_collection("in", vec![upstream]);
    let outcome = engine.clean(&event).expect("event should clean");

    let cleaned = &outcome.objects[0];
    assert_eq!(cleaned.overlaps.keys().map(String::as_str).collect::<Vec<_>>(), vec!["x"]);
    assert_eq!(cleaned.overlaps("x"), Some(&[][..]));
    assert_eq!(
        event.collections["in"][0].overlaps("stale"),
        Some(&[ObjectRef::new("jets", 0)][..]),
        "the source collection is not modified"
    );
}

#[test]
fn output_preserves_input_order_and_is_a_subsequence() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in")
        .with_preselection("pt >= 5")
        .with_overlap_test(scripted("x", true, &[4.0]))
        .with_final_cut("pt < 90");
    let mut engine = engine(&config, &log);

    let inputs = vec![
        object(1.0, 50.0),
        object(2.0, 1.0),
        object(3.0, 20.0),
        object(4.0, 30.0),
        object(5.0, 99.0),
        object(6.0, 7.0),
    ];
    let event = Event::new(1).with_collection("in", inputs);
    let outcome = engine.clean(&event).expect("event should clean");

    assert_eq!(ids(&outcome.objects), vec![1.0, 3.0, 6.0]);
    assert_eq!(outcome.summary.rejected_by_final_cut, 1);
}

#[test]
fn tightening_preselection_never_adds_objects() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let inputs: Vec<_> = (1..=8)
        .map(|id| object(f64::from(id), f64::from(id) * 10.0))
        .collect();
    let event = Event::new(1).with_collection("in", inputs);

    let mut accepted = Vec::new();
    for cut in ["", "pt > 20", "pt > 20 && id != 5", "pt > 60"] {
        let config = PipelineConfig::new("clean", "in")
            .with_preselection(cut)
            .with_overlap_test(scripted("x", true, &[7.0]));
        let outcome = engine(&config, &log)
            .clean(&event)
            .expect("event should clean");
        accepted.push(ids(&outcome.objects));
    }

    for pair in accepted.windows(2) {
        assert!(
            pair[1].iter().all(|id| pair[0].contains(id)),
            "{:?} is not a subset of {:?}",
            pair[1],
            pair[0]
        );
    }
}

#[test]
fn final_cut_can_use_attributes_and_sees_annotated_object() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in")
        .with_overlap_test(scripted("x", false, &[2.0]))
        .with_final_cut("has(isolation) && isolation < 0.1");
    let mut engine = engine(&config, &log);

    let event = Event::new(1).with_collection(
        "in",
        vec![
            object(1.0, 10.0).with_attribute("isolation", 0.05),
            object(2.0, 10.0).with_attribute("isolation", 0.5),
            object(3.0, 10.0),
        ],
    );
    let outcome = engine.clean(&event).expect("event should clean");

    assert_eq!(ids(&outcome.objects), vec![1.0]);
    assert_eq!(outcome.summary.rejected_by_final_cut, 2);
}

#[test]
fn cleaning_is_deterministic() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in")
        .with_preselection("pt > 15")
        .with_overlap_test(scripted("x", false, &[2.0, 3.0]))
        .with_overlap_test(scripted("y", true, &[3.0]));
    let event = Event::new(9).with_collection(
        "in",
        vec![object(1.0, 10.0), object(2.0, 20.0), object(3.0, 30.0), object(4.0, 40.0)],
    );

    let mut engine = engine(&config, &log);
    let first = engine.clean(&event).expect("first pass");
    let second = engine.clean(&event).expect("second pass");
    let fresh = self::engine(&config, &log).clean(&event).expect("fresh engine");

    assert_eq!(first.objects, second.objects);
    assert_eq!(first.objects, fresh.objects);
    assert_eq!(first.summary, fresh.summary);
}

#[test]
fn unknown_algorithm_fails_construction() {
    let config = PipelineConfig::new("clean", "in").with_overlap_test(OverlapTestConfig::new(
        "foo",
        "byFoo",
        true,
        serde_json::json!({}),
    ));

    let err = CleaningEngine::<PhysicsObject>::from_config(&config, &OverlapTestRegistry::with_builtin())
        .err()
        .expect("byFoo should not build");
    assert!(err.is_configuration());
    assert!(err.message.contains("byFoo"), "unexpected error: {err}");
}

#[test]
fn missing_source_commits_nothing() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean", "in").with_overlap_test(scripted("x", true, &[]));
    let mut engine = engine(&config, &log);
    let mut sink = CollectingSink::new();

    let err = engine
        .run_event(&Event::new(4).with_collection("other", vec![object(1.0, 1.0)]), &mut sink)
        .expect_err("missing source should fail");

    assert!(err.is_input_missing());
    assert!(sink.committed().is_empty());
}

#[test]
fn missing_auxiliary_collection_commits_nothing() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let test = OverlapTestConfig::new(
        "x",
        "scripted",
        true,
        serde_json::json!({ "require_collection": "muons" }),
    );
    let config = PipelineConfig::new("clean", "in").with_overlap_test(test);
    let mut engine = engine(&config, &log);
    let mut sink = CollectingSink::new();

    let event = Event::new(5).with_collection("in", vec![object(1.0, 10.0)]);
    let err = engine
        .run_event(&event, &mut sink)
        .expect_err("missing auxiliary collection should fail");

    assert!(err.is_input_missing());
    assert!(sink.committed().is_empty());
    assert!(evaluated_ids(&log, "x").is_empty(), "no object is tested after refresh fails");
}

#[test]
fn run_event_commits_under_pipeline_name() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let config = PipelineConfig::new("clean_jets", "jets").with_overlap_test(scripted("x", true, &[2.0]));
    let mut engine = engine(&config, &log);
    let mut sink = CollectingSink::new();

    for event_id in [10, 11] {
        let event = Event::new(event_id).with_collection("jets", vec![object(1.0, 10.0), object(2.0, 10.0)]);
        engine.run_event(&event, &mut sink).expect("event should clean");
    }

    let committed = sink.into_committed();
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[0].event_id, 10);
    assert_eq!(committed[1].event_id, 11);
    assert!(committed.iter().all(|entry| entry.label == "clean_jets"));
    assert_eq!(ids(&committed[1].objects), vec![1.0]);

    let refreshed: Vec<_> = log
        .lock()
        .expect("lock")
        .iter()
        .filter_map(|call| match call {
            OverlapCall::Refresh { event_id, .. } => Some(*event_id),
            OverlapCall::Evaluate { .. } => None,
        })
        .collect();
    assert_eq!(refreshed, vec![10, 11]);
}

#[test]
fn independent_engines_run_on_separate_threads() {
    let jets = PipelineConfig::new("clean_jets", "jets").with_overlap_test(OverlapTestConfig::new(
        "electrons",
        "byDeltaR",
        true,
        serde_json::json!({ "src": "electrons", "delta_r": 0.4 }),
    ));
    let photons = PipelineConfig::new("clean_photons", "photons").with_overlap_test(
        OverlapTestConfig::new(
            "electrons",
            "bySuperClusterSeed",
            true,
            serde_json::json!({ "src": "electrons" }),
        ),
    );
    let registry = OverlapTestRegistry::with_builtin();
    let mut jet_engine =
        CleaningEngine::<PhysicsObject>::from_config(&jets, &registry).expect("jet engine");
    let mut photon_engine =
        CleaningEngine::<PhysicsObject>::from_config(&photons, &registry).expect("photon engine");

    let seed = ObjectRef::new("super_clusters", 0);
    let event = Event::new(3)
        .with_collection(
            "electrons",
            vec![PhysicsObject::kinematic(30.0, 0.5, 1.0).with_component("super_cluster_seed", seed.clone())],
        )
        .with_collection(
            "jets",
            vec![PhysicsObject::kinematic(40.0, 0.6, 1.1), PhysicsObject::kinematic(40.0, -1.5, -2.0)],
        )
        .with_collection(
            "photons",
            vec![
                PhysicsObject::kinematic(25.0, 0.5, 1.0).with_component("super_cluster_seed", seed),
                PhysicsObject::kinematic(25.0, 2.0, 0.0)
                    .with_component("super_cluster_seed", ObjectRef::new("super_clusters", 1)),
            ],
        );

    let (jets_out, photons_out) = std::thread::scope(|scope| {
        let jets = scope.spawn(|| jet_engine.clean(&event));
        let photons = scope.spawn(|| photon_engine.clean(&event));
        (
            jets.join().expect("jet thread"),
            photons.join().expect("photon thread"),
        )
    });

    let jets_out = jets_out.expect("jets should clean");
    let photons_out = photons_out.expect("photons should clean");
    assert_eq!(jets_out.objects.len(), 1);
    assert_eq!(jets_out.objects[0].attributes["eta"], -1.5);
    assert_eq!(photons_out.objects.len(), 1);
    assert_eq!(photons_out.objects[0].attributes["eta"], 2.0);
}
