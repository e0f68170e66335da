use std::path::Path;

use anyhow::{Context, Result};

const ROWS: usize = 891;

/// Minimal deterministic PRNG (SplitMix64)
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Pick from `(item, weight)` pairs; weights need not sum to 1.
    fn weighted<'a>(&mut self, items: &[(&'a str, f64)]) -> &'a str {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut target = self.next_f64() * total;
        for &(item, weight) in items {
            if target < weight {
                return item;
            }
            target -= weight;
        }
        items[items.len() - 1].0
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let output_path = Path::new("Data").join("clean_titanic.csv");
    std::fs::create_dir_all("Data").context("creating Data directory")?;
    let mut writer = csv::Writer::from_path(&output_path).context("creating output file")?;
    writer.write_record([
        "PassengerId", "Survived", "Pclass", "Sex", "Age", "SibSp", "Parch", "Fare", "Embarked",
    ])?;

    let mut survivors = 0;
    for id in 1..=ROWS {
        let pclass: u8 = match rng.weighted(&[("1", 0.24), ("2", 0.21), ("3", 0.55)]) {
            "1" => 1,
            "2" => 2,
            _ => 3,
        };
        let sex = rng.weighted(&[("male", 0.65), ("female", 0.35)]);

        // Survival odds depend on sex and class.
        let base: f64 = if sex == "female" { 0.74 } else { 0.19 };
        let class_shift: f64 = match pclass {
            1 => 0.15,
            2 => 0.0,
            _ => -0.12,
        };
        let survived = rng.chance((base + class_shift).clamp(0.02, 0.98));
        survivors += usize::from(survived);

        let age = if rng.chance(0.2) {
            String::new()
        } else {
            let mean = match pclass {
                1 => 38.0,
                2 => 30.0,
                _ => 25.0,
            };
            format!("{:.1}", rng.gauss(mean, 13.0).clamp(0.42, 80.0))
        };
        let sib_sp = rng.weighted(&[("0", 0.68), ("1", 0.23), ("2", 0.04), ("3", 0.05)]);
        let parch = rng.weighted(&[("0", 0.76), ("1", 0.13), ("2", 0.09), ("3", 0.02)]);
        let fare_base = match pclass {
            1 => 84.0,
            2 => 20.0,
            _ => 13.0,
        };
        let fare = format!("{:.4}", rng.gauss(fare_base, fare_base * 0.4).max(0.0));
        let embarked = if rng.chance(0.003) {
            ""
        } else {
            rng.weighted(&[("S", 0.72), ("C", 0.19), ("Q", 0.09)])
        };

        writer.write_record([
            id.to_string().as_str(),
            if survived { "1" } else { "0" },
            pclass.to_string().as_str(),
            sex,
            age.as_str(),
            sib_sp,
            parch,
            fare.as_str(),
            embarked,
        ])?;
    }
    writer.flush().context("flushing output file")?;

    log::info!("{survivors} of {ROWS} generated passengers survived");
    println!("Wrote {ROWS} passengers to {}", output_path.display());
    Ok(())
}
