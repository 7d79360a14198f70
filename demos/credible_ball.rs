use credball::partition::canonicalize;
use credball::{
    credible_ball, expected_vi, expected_vi_lower_bound, posterior_similarity, CredibleBallConfig,
    PartitionDistance,
};
use ndarray::Array2;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=credball=debug shows the per-call summaries.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // A toy posterior over 6 items: mostly three pairs, sometimes merged or split.
    let draws: Vec<[usize; 6]> = vec![
        [1, 1, 2, 2, 3, 3],
        [1, 1, 2, 2, 3, 3],
        [1, 1, 2, 2, 3, 3],
        [1, 1, 2, 2, 2, 2],
        [1, 1, 2, 2, 3, 4],
        [1, 1, 1, 1, 2, 2],
        [1, 1, 2, 2, 3, 3],
        [1, 2, 3, 3, 4, 4],
    ];
    let flat: Vec<usize> = draws.iter().flat_map(|d| canonicalize(d)).collect();
    let cls_draw = Array2::from_shape_vec((draws.len(), 6), flat)?;

    let c_star = [1, 1, 2, 2, 3, 3];
    for distance in [PartitionDistance::Vi, PartitionDistance::Binder] {
        let config = CredibleBallConfig::new()
            .with_distance(distance)
            .with_alpha(0.1);
        let ball = credible_ball(&c_star, cls_draw.view(), &config)?;

        println!(
            "{distance} credible ball ({} of {} draws)",
            ball.n_members(),
            cls_draw.nrows()
        );
        println!("  horizontal     d={:.4}  {:?}", ball.dist_horiz, rows(&ball.c_horiz));
        println!("  upper vertical d={:.4}  {:?}", ball.dist_uppervert, rows(&ball.c_uppervert));
        println!("  lower vertical d={:.4}  {:?}", ball.dist_lowervert, rows(&ball.c_lowervert));
    }

    let psm = posterior_similarity(cls_draw.view())?;
    let ev = expected_vi(cls_draw.view(), cls_draw.view())?;
    let lb = expected_vi_lower_bound(cls_draw.view(), psm.view())?;
    println!("expected VI / PSM bound per draw:");
    for (m, (e, l)) in ev.iter().zip(lb.iter()).enumerate() {
        println!("  draw {m}: {e:.4} / {l:.4}");
    }

    Ok(())
}

fn rows(a: &Array2<usize>) -> Vec<Vec<usize>> {
    a.outer_iter().map(|r| r.to_vec()).collect()
}
