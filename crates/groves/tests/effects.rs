//! Effect analysis of a bagged ensemble saved to disk.

use std::path::Path;

use groves::io::report::{write_effect, write_joint_effect};
use groves::testing::additive_regression;
use groves::{
    BaggedTrainer, Dataset, EffectAnalyzer, Grove, GroveError, ModelHeader, ModelReader, ModelWriter, Parallelism,
    TrainConfig, Verbosity,
};

fn train_model(path: &Path, data: &mut Dataset) {
    let config = TrainConfig::builder()
        .train_path("train.dta")
        .valid_path("valid.dta")
        .attr_path("data.attr")
        .min_alpha(0.05)
        .max_tig(3)
        .bag_n(4)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap();
    let header = ModelHeader::new(config.mode, config.max_tig, config.min_alpha);
    let mut writer = ModelWriter::create(path, header).unwrap();
    BaggedTrainer::new(&config, Parallelism::Sequential)
        .train::<Grove, _>(data, Some(&mut writer))
        .unwrap();
}

#[test]
fn partial_dependence_follows_signal() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.bin");
    let mut data = additive_regression(300, 60, 4);
    train_model(&model, &mut data);

    let mut reader = ModelReader::open(&model).unwrap();
    let curves = EffectAnalyzer::new(&mut data)
        .partial_dependence::<Grove, _>(&mut reader, &[0, 3], 10)
        .unwrap();

    // y rises by 2 across x0, x3 is noise
    let x0 = &curves[0].points;
    assert_eq!(x0.len(), 10);
    assert!(x0.windows(2).all(|w| w[0].value < w[1].value));
    assert_eq!(x0.iter().map(|p| p.count).sum::<usize>(), 300);
    assert!(x0[9].effect - x0[0].effect > 0.8);

    let path = write_effect(dir.path(), data.attr_name(0), &curves[0]).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().count(), 12);
}

#[test]
fn joint_effect_with_density() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.bin");
    let mut data = additive_regression(300, 60, 8);
    train_model(&model, &mut data);

    let mut reader = ModelReader::open(&model).unwrap();
    let joints = EffectAnalyzer::new(&mut data)
        .joint_effects::<Grove, _>(&mut reader, &[(0, 1), (0, 2)], (5, 4), &[("x4", 0.5)])
        .unwrap();
    assert_eq!(joints.len(), 2);

    for joint in &joints {
        assert_eq!(joint.effects.dim(), (5, 4));
        let density = joint.density.as_ref().unwrap();
        let total = density.proportions.sum();
        assert!(total > 0.0 && total <= 1.0 + 1e-9, "density total {total}");
        assert!(density.proportions.iter().all(|&p| p >= 0.0));
    }

    let joint = &joints[0];
    write_joint_effect(dir.path(), ("x0", "x1"), joint).unwrap();
    assert!(dir.path().join("x0.x1.iplot.txt").exists());
    assert!(dir.path().join("x0.x1.iplot.dens.txt").exists());
}

#[test]
fn ignored_fixed_attribute_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.bin");
    let mut data = additive_regression(120, 30, 1);
    train_model(&model, &mut data);
    data.ignore_attr(4);

    let mut reader = ModelReader::open(&model).unwrap();
    let err = EffectAnalyzer::new(&mut data)
        .joint_effects::<Grove, _>(&mut reader, &[(0, 1)], (3, 3), &[("x4", 0.5)])
        .unwrap_err();
    assert!(matches!(err, GroveError::InactiveAttribute(name) if name == "x4"));
}
