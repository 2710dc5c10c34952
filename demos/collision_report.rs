use num_bigint::BigUint;
use preimages::{CollisionReport, GeneratorConfig, Params, UnderflowPolicy};

/// Width of the longest bar in the text plot.
const PLOT_WIDTH: usize = 60;

fn usage() -> ! {
    eprintln!(
        "Usage:\n  cargo run --example collision_report -- [--fail-on-underflow] [<n> <r>]\n\n\
With no sizes, the Sapling ToScalar case is used: n = 2^256, r = Jubjub subgroup order.\n\
Sizes are decimal integers with 1 <= r <= n."
    );
    std::process::exit(2);
}

fn parse_size(s: &str) -> BigUint {
    BigUint::parse_bytes(s.as_bytes(), 10).unwrap_or_else(|| usage())
}

fn main() {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
    }
    let mut config = GeneratorConfig::default();
    if let Some(i) = args.iter().position(|a| a == "--fail-on-underflow") {
        args.remove(i);
        config.underflow = UnderflowPolicy::Fail;
    }

    let params = match args.as_slice() {
        [] => Params::sapling_to_scalar(),
        [n, r] => Params::new(parse_size(n), parse_size(r)),
        _ => usage(),
    };
    let report = match params.and_then(|p| CollisionReport::compute_with(p, &config)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    print!("{report}");
    println!(
        "entropy loss    = {:.6} bits",
        report.summary.entropy_loss_bits()
    );
    println!("image fraction  = {:.9}", report.image_fraction);
    println!();

    // Probability against frequency, one bar per k.
    let Some(mode) = report.mode() else {
        return;
    };
    if mode.p <= 0.0 {
        return;
    }
    println!("Distribution of output frequencies");
    for t in report.rows() {
        let len = ((t.p / mode.p) * PLOT_WIDTH as f64).round() as usize;
        println!("{:>4} | {}", t.k, "#".repeat(len));
    }
}
