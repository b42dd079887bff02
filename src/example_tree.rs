//! Random example input for the `ExampleSelector`.
//!
//! Each record holds `my_int ~ Poisson(10)`, `my_float ~ Gaus(50, 10)` and
//! `my_int`-long sequences derived from `my_float`.

use crate::columns::ColumnData;
use crate::error::Result;
use crate::stream::Tree;

/// Gaussian and Poisson draws on top of `fastrand`.
pub struct Sampler {
    rng: fastrand::Rng,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Box-Muller transform.
    pub fn gaus(&mut self, mean: f64, sigma: f64) -> f64 {
        // 1 - f64() lies in (0, 1], keeping ln() finite
        let u1 = 1.0 - self.rng.f64();
        let u2 = self.rng.f64();
        mean + sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Knuth's multiplication method; a rounded Gaussian above a mean of 500.
    pub fn poisson(&mut self, mean: f64) -> u32 {
        if mean <= 0.0 {
            return 0;
        }
        if mean > 500.0 {
            return self.gaus(mean, mean.sqrt()).round().max(0.0) as u32;
        }
        let limit = (-mean).exp();
        let mut count = 0u32;
        let mut product = self.rng.f64();
        while product > limit {
            count += 1;
            product *= self.rng.f64();
        }
        count
    }
}

/// Generate `entries` records into a tree called `name`.
pub fn generate(name: &str, entries: usize, seed: u64) -> Result<Tree> {
    let mut sampler = Sampler::new(seed);

    let mut my_int = Vec::with_capacity(entries);
    let mut my_float = Vec::with_capacity(entries);
    let mut my_vector_int = Vec::with_capacity(entries);
    let mut my_vector_float = Vec::with_capacity(entries);
    let mut my_vector_vector_float = Vec::with_capacity(entries);

    for _ in 0..entries {
        let n = sampler.poisson(10.0) as i32;
        let x = sampler.gaus(50.0, 10.0) as f32;

        let mut ints = Vec::with_capacity(n as usize);
        let mut floats = Vec::with_capacity(n as usize);
        let mut others = Vec::with_capacity(n as usize);
        for _ in 0..n {
            ints.push(sampler.poisson(x as f64) as i32);
            floats.push(sampler.gaus(x as f64 / 2.0, 5.0) as f32);
            others.push(sampler.gaus(x as f64 / 3.0, 2.0) as f32);
        }

        my_int.push(n);
        my_float.push(x);
        my_vector_int.push(ints);
        my_vector_vector_float.push(vec![floats.clone(), others]);
        my_vector_float.push(floats);
    }

    Ok(Tree::from_columns(
        name,
        vec![
            ("my_int".to_string(), ColumnData::from_values(my_int)),
            ("my_float".to_string(), ColumnData::from_values(my_float)),
            ("my_vector_int".to_string(), ColumnData::from_values(my_vector_int)),
            ("my_vector_float".to_string(), ColumnData::from_values(my_vector_float)),
            (
                "my_vector_vector_float".to_string(),
                ColumnData::from_values(my_vector_vector_float),
            ),
        ],
    )?
    .with_title("Example Tree"))
}
