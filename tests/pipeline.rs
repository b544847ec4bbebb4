use brand_pricing::app::pipeline::{PipelineInputs, run_stages};
use brand_pricing::data::{SampleConfig, generate_sample};
use brand_pricing::domain::{AGGREGATE_KEY, EstimateStatus, PipelineConfig, RationaleTag, Stage};
use brand_pricing::io::{load_elasticity_report, read_table, write_reports};

#[test]
fn synthetic_run_recovers_elasticities_and_respects_bounds() {
    let sample = generate_sample(&SampleConfig::default()).unwrap();
    let inputs = PipelineInputs {
        table: &sample.table,
        competitors: Some(&sample.competitors),
        benchmarks: None,
    };
    let config = PipelineConfig::default();
    let out = run_stages(Stage::All, &inputs, &config, None).unwrap();

    let elasticity = out.elasticity.as_ref().unwrap();
    for (brand, truth) in &sample.true_elasticity {
        let e = elasticity.get(brand).unwrap();
        match e.status {
            EstimateStatus::Ok => {
                let b = e.coefficient.unwrap();
                assert!((b - truth).abs() < 0.3, "{brand}: estimated {b}, true {truth}");
            }
            // The sparse brand only has two rows.
            EstimateStatus::InsufficientData => assert_eq!(e.n_observations, 2),
            EstimateStatus::DegenerateInput => panic!("{brand} should not be degenerate"),
        }
    }

    let forecast = out.forecast.as_ref().unwrap();
    let series = forecast.get(AGGREGATE_KEY).unwrap();
    assert_eq!(series.projected().count(), config.periods);
    assert!(series.points.iter().all(|p| p.value >= 0.0));

    let recs = out.recommendations.as_ref().unwrap();
    assert_eq!(recs.entries.len(), sample.true_elasticity.len());
    for (brand, rec) in &recs.entries {
        assert!(rec.current_price > 0.0);
        assert!(
            rec.change().abs() <= config.max_step + 1e-9,
            "{brand}: change {} exceeds band",
            rec.change()
        );
        assert!(!rec.rationale.is_empty());
    }
    let sparse = recs.get("Fendi").unwrap();
    assert!(sparse.rationale.contains(&RationaleTag::InsufficientDataSkipped));
    assert!(!sparse.rationale.contains(&RationaleTag::Elasticity));

    // Same inputs, same outputs.
    let again = run_stages(Stage::All, &inputs, &config, None).unwrap();
    assert_eq!(out, again);
}

#[test]
fn exported_elasticity_report_can_be_reused() {
    let sample = generate_sample(&SampleConfig {
        brands: 3,
        seed: 7,
        ..Default::default()
    })
    .unwrap();
    let inputs = PipelineInputs {
        table: &sample.table,
        competitors: None,
        benchmarks: None,
    };
    let config = PipelineConfig::default();
    let first = run_stages(Stage::All, &inputs, &config, None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = write_reports(dir.path(), &first, &config).unwrap();
    for name in [
        "elasticity.json",
        "forecast.json",
        "recommendations.json",
        "recommendations.csv",
        "manifest.json",
    ] {
        assert!(written.contains(&dir.path().join(name)), "missing {name}");
    }

    let manifest: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(dir.path().join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["config"]["max_step"], 0.1);

    let reused = load_elasticity_report(&dir.path().join("elasticity.json")).unwrap();
    assert_eq!(&reused, first.elasticity.as_ref().unwrap());

    let priced = run_stages(Stage::Price, &inputs, &config, Some(&reused)).unwrap();
    assert_eq!(priced.recommendations, first.recommendations);
    assert!(priced.elasticity.is_none());
}

#[test]
fn csv_input_flows_through_every_stage() {
    let csv = "\
Brand,Year,Price,Sales Volume
Acme,2020,10,100
Acme,2021,12,80
Acme,2022,15,60
Acme,2022,14,65
Solo,2022,50,10
";
    let ingested = read_table(csv.as_bytes()).unwrap();
    assert!(ingested.row_errors.is_empty());

    let inputs = PipelineInputs {
        table: &ingested.table,
        competitors: None,
        benchmarks: None,
    };
    let out = run_stages(Stage::All, &inputs, &PipelineConfig::default(), None).unwrap();

    let acme = out.elasticity.as_ref().unwrap().get("Acme").unwrap();
    assert_eq!(acme.status, EstimateStatus::Ok);
    assert!(acme.coefficient.unwrap() < 0.0);
    assert_eq!(
        out.elasticity.as_ref().unwrap().get("Solo").unwrap().status,
        EstimateStatus::InsufficientData
    );

    let recs = out.recommendations.unwrap();
    let acme = recs.get("Acme").unwrap();
    assert_eq!(acme.reference_year, 2022);
    assert!((acme.current_price - 14.5).abs() < 1e-9);

    let solo = recs.get("Solo").unwrap();
    assert_eq!(solo.recommended_price, solo.current_price);
    assert!(solo.rationale.contains(&RationaleTag::NoSignal));
}
