//! Save directory to image, end to end.

use std::fs;
use std::path::Path;

use clade_diagram::config::BatchConfig;
use clade_diagram::loader::{load_censuses, SaveDirectory};
use clade_diagram::{batch, CladeConfig, CladeTree, Diagram};
use serde_json::json;

fn write_save(dir: &Path, time: i64, species: &[(&str, u32)]) {
    let organisms: Vec<_> = species
        .iter()
        .flat_map(|&(clade, population)| {
            (0..population).map(move |_| {
                json!({
                    "_alive": true,
                    "_geneticCode": {
                        "_cladeID": clade,
                        "_symmetry": 2,
                        "_mirror": false,
                        "_genes": [
                            {"_theta": 0.0, "_length": 12.0, "_branch": 0, "_color": {"_value": 0x33aa33}},
                            {"_theta": 0.7, "_length": 6.0, "_branch": 1, "_color": {"_value": 0xaa3333}}
                        ]
                    }
                })
            })
        })
        .collect();
    let document = json!({"_organisms": organisms, "_worldStatistics": {"_time": time}});
    fs::write(dir.join(format!("world@{time}.json")), document.to_string()).unwrap();
}

fn populate(dir: &Path) {
    write_save(dir, 100, &[("1", 30)]);
    write_save(dir, 200, &[("1", 25), ("1a", 12)]);
    write_save(dir, 300, &[("1a", 20), ("1b", 11), ("2", 3)]);
    write_save(dir, 400, &[("1a", 18), ("1a-1", 14)]);
}

#[test]
fn test_single_image_run() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let saves = SaveDirectory::open(dir.path()).unwrap();

    let written = batch::run(&saves, &CladeConfig::default(), None).unwrap();
    assert_eq!(written, vec![dir.path().join("clade.png")]);

    let censuses = load_censuses(&saves).unwrap();
    assert_eq!(censuses.len(), 4);
    let tree = CladeTree::build(censuses, &CladeConfig::default().tree).unwrap();
    let diagram = Diagram::compute(tree, &CladeConfig::default().layout).unwrap();

    let dimensions = image::image_dimensions(&written[0]).unwrap();
    assert_eq!(dimensions, diagram.pixel_size(), "image matches the laid out diagram");
}

#[test]
fn test_small_lineage_is_filtered_out() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let saves = SaveDirectory::open(dir.path()).unwrap();

    let tree = CladeTree::build(load_censuses(&saves).unwrap(), &CladeConfig::default().tree).unwrap();
    let lineages: Vec<String> = tree
        .row(2)
        .map(|id| tree.lineage(id).id().to_string())
        .collect();
    assert!(lineages.contains(&"1a".to_string()));
    assert!(!lineages.contains(&"2".to_string()), "a population of 3 never reaches the threshold");
}

#[test]
fn test_split_run_writes_export_files() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let saves = SaveDirectory::open(dir.path()).unwrap();

    let config = CladeConfig {
        batch: BatchConfig {
            clade_start: 1,
            clade_end: None,
            clade_split_interval: 2,
        },
        ..CladeConfig::default()
    };
    let written = batch::run(&saves, &config, None).unwrap();

    let export = dir.path().join("clade").join("export");
    assert_eq!(
        written,
        vec![export.join("clade_1-2.png"), export.join("clade_3-3.png")]
    );
    for path in &written {
        let (width, height) = image::image_dimensions(path).unwrap();
        assert!(width > 0 && height > 0, "{path:?} is a readable image");
    }
    assert!(!dir.path().join("clade.png").exists());
}

#[test]
fn test_second_run_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let saves = SaveDirectory::open(dir.path()).unwrap();
    let first = load_censuses(&saves).unwrap();

    // Cache entries stand in for saves that are gone.
    for time in [100, 200, 300, 400] {
        fs::remove_file(dir.path().join(format!("world@{time}.json"))).unwrap();
    }
    let second = load_censuses(&saves).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.time(), b.time());
        assert_eq!(a.population(), b.population());
    }

    saves.clear_cache().unwrap();
    assert!(load_censuses(&saves).unwrap().is_empty());
}

#[test]
fn test_empty_directory_has_no_generations() {
    let dir = tempfile::tempdir().unwrap();
    let saves = SaveDirectory::open(dir.path()).unwrap();
    let err = batch::run(&saves, &CladeConfig::default(), None).unwrap_err();
    assert!(matches!(err, clade_diagram::CladeError::NoGenerations));
}
