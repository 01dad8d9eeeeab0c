use linfa::prelude::*;
use linfa::dataset::Pr;
use linfa::ParamGuard;
use linfa_ffm::{Cell, Ffm, FfmError, Frame, Node, SparseRows};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// Clicks depend on the user only: users below five click on every ad
fn clicks(nsamples: usize, seed: u64) -> DatasetBase<SparseRows<f32>, Array1<bool>> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(nsamples);
    let mut labels = Vec::with_capacity(nsamples);
    for _ in 0..nsamples {
        let user = rng.gen_range(0..10);
        let ad = rng.gen_range(10..20);
        rows.push(vec![Node::new(0, user, 1.0), Node::new(1, ad, 1.0)]);
        labels.push(user < 5);
    }
    DatasetBase::new(SparseRows::with_shape(rows, 20, 2), Array1::from(labels))
}

fn accuracy(predictions: &Array1<Pr>, labels: &Array1<bool>) -> f32 {
    let hits = predictions
        .iter()
        .zip(labels)
        .filter(|(p, y)| (***p > 0.5) == **y)
        .count();
    hits as f32 / labels.len() as f32
}

#[test]
fn learns_user_preferences() {
    let train = clicks(500, 1);
    let valid = clicks(200, 2);

    let (model, history) = Ffm::<f32>::params()
        .iterations(30)
        .eta(0.2)
        .quiet(true)
        .check()
        .unwrap()
        .fit_with_validation(&train, &valid)
        .unwrap();

    let first = history.first().unwrap();
    let last = history.last().unwrap();
    assert!(last.train < first.train);
    assert!(last.valid.unwrap() < first.valid.unwrap());

    let predictions = model.predict(&valid);
    assert!(
        accuracy(&predictions, valid.targets()) >= 0.9,
        "accuracy {}",
        accuracy(&predictions, valid.targets())
    );
}

#[test]
fn saved_model_predicts_the_same() {
    let train = clicks(100, 3);
    let model = Ffm::<f32>::params()
        .iterations(5)
        .latent_dim(6)
        .normalization(true)
        .quiet(true)
        .fit(&train)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clicks.model");
    model.save(&path).unwrap();
    let loaded = Ffm::<f32>::load(&path).unwrap();

    assert_eq!(loaded.latent_dim(), 6);
    assert!(loaded.normalization());
    let expected: Array1<Pr> = model.predict(&train);
    assert_eq!(expected, loaded.predict_rows(train.records()));
}

#[test]
fn frame_pipeline() {
    let mut frame = Frame::new(vec!["clicked", "user", "ad", "note"]);
    for i in 0..40i64 {
        let user = i % 4;
        frame
            .push_row(vec![
                Cell::from((user < 2) as i64),
                Cell::from(vec![(user, 1.0f64)]),
                Cell::from(vec![(4 + i % 3, 1i64)]),
                Cell::from("ignored"),
            ])
            .unwrap();
    }
    let rows = frame.field_rows("clicked", &["user", "ad"]).unwrap();

    let params = Ffm::<f64>::params()
        .iterations(20)
        .quiet(true)
        .check()
        .unwrap();
    let model = params.fit_source(&rows).unwrap();
    assert_eq!((model.nfeatures(), model.nfields()), (7, 2));

    let dataset = rows.to_dataset::<f64>().unwrap();
    let predictions = model.predict(&dataset);
    assert!(accuracy(&predictions, dataset.targets()) >= 0.9);
}

#[test]
fn malformed_label_stops_training() {
    let mut frame = Frame::new(vec!["clicked", "user"]);
    frame
        .push_row(vec![Cell::from(1), Cell::from(vec![(0i64, 1.0f64)])])
        .unwrap();
    frame
        .push_row(vec![Cell::from("yes"), Cell::from(vec![(1i64, 1.0f64)])])
        .unwrap();
    let rows = frame.field_rows("clicked", &["user"]).unwrap();
    let res = Ffm::<f32>::params()
        .quiet(true)
        .check()
        .unwrap()
        .fit_source(&rows);
    assert!(matches!(
        res,
        Err(FfmError::LabelType {
            row: 1,
            found: "string"
        })
    ));
}

#[test]
fn unseen_ids_are_neutral() {
    let train = clicks(50, 4);
    let model = Ffm::<f32>::params()
        .iterations(2)
        .quiet(true)
        .fit(&train)
        .unwrap();
    let rows = SparseRows::new(vec![
        vec![Node::new(0, 100, 1.0), Node::new(1, 200, 1.0)],
        vec![Node::new(5, 1, 1.0), Node::new(1, 12, 1.0)],
    ]);
    let predictions = model.predict_rows(&rows);
    assert_eq!(*predictions[0], 0.5);
    assert_eq!(*predictions[1], 0.5);
}
