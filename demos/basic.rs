use preimages::{
    coverage::{entropy_upper_bound_bits, image_fraction},
    entropy_estimate_bits, preimage_distribution, Params,
};

fn main() {
    // 1000 inputs thrown at 10 outputs: about 100 preimages each.
    let params = Params::from_u64(1000, 10).unwrap();
    let dist = preimage_distribution(&params).unwrap();

    let h = entropy_estimate_bits(&dist, &params).unwrap();
    let h_ideal = params.ideal_entropy_bits();
    let h_bound = entropy_upper_bound_bits(&dist, &params).unwrap();
    let hit = image_fraction(&dist).unwrap();

    assert!(h <= h_bound + 1e-9);
    assert!(h_bound <= h_ideal + 1e-12);
    assert!((dist.total_mass() - 1.0).abs() < 1e-4);

    println!(
        "n/r={:.1} terms={} sum={:.6} H={:.6} H_bound={:.6} H_ideal={:.6} hit≈{:.4}",
        params.expected_peak_frequency(),
        dist.as_series().map_or(0, <[f64]>::len),
        dist.total_mass(),
        h,
        h_bound,
        h_ideal,
        hit
    );
}
