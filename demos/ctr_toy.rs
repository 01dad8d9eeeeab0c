use linfa::prelude::*;
use linfa::ParamGuard;
use linfa_ffm::{Cell, Ffm, Frame, Result};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

const USERS: i64 = 50;
const ADS: i64 = 20;
const SITES: i64 = 5;

/// Impressions of ads to users on sites. A user clicks when the ad category
/// matches their taste, unless the site is a bad placement.
fn impressions(rng: &mut Xoshiro256Plus, n: usize) -> Result<Frame> {
    let mut frame = Frame::new(vec!["clicked", "user", "ad", "site"]);
    for _ in 0..n {
        let user = rng.gen_range(0..USERS);
        let ad = rng.gen_range(0..ADS);
        let site = rng.gen_range(0..SITES);
        let clicked = user % 3 == ad % 3 && site != 0 && rng.gen_bool(0.9);
        frame.push_row(vec![
            Cell::from(clicked as i64),
            Cell::from(vec![(user, 1.0)]),
            Cell::from(vec![(USERS + ad, 1.0)]),
            Cell::from(vec![(USERS + ADS + site, 1.0)]),
        ])?;
    }
    Ok(frame)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let train = impressions(&mut rng, 20_000)?;
    let valid = impressions(&mut rng, 2_000)?;
    let columns = ["user", "ad", "site"];
    let nfeatures = (USERS + ADS + SITES) as usize;
    let train_rows = train.field_rows("clicked", &columns)?.with_nfeatures(nfeatures);
    let valid_rows = valid.field_rows("clicked", &columns)?.with_nfeatures(nfeatures);

    let params = Ffm::<f32>::params()
        .eta(0.2)
        .lambda(2e-5)
        .latent_dim(4)
        .iterations(10)
        .normalization(true)
        .n_threads(4)
        .check()?;
    let (model, history) = params.fit_source_with_validation(&train_rows, &valid_rows)?;

    let valid = valid_rows.to_dataset::<f32>()?;
    let predictions = model.predict(&valid);
    let hits = predictions
        .iter()
        .zip(valid.targets())
        .filter(|(p, y)| (***p > 0.5) == **y)
        .count();
    if let Some(last) = history.last() {
        println!("final train log loss {:.4}", last.train);
    }
    println!("valid accuracy {:.3}", hits as f32 / valid.nsamples() as f32);

    let path = std::env::temp_dir().join("ctr_toy.model");
    model.save(&path)?;
    println!("model written to {}", path.display());
    Ok(())
}
