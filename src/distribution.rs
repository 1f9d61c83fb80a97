//! Probability distributions from which base capacities are drawn.
//!
//! A [`DistributionSpec`] is what appears in the input files. It is validated once into a
//! [`StochasticDrawSource`], which is read-only thereafter: the random number generator is owned by
//! whoever draws from it, so that each capacity engine has its own reproducible stream.
use anyhow::{Result, anyhow, ensure};
use rand::Rng;
use rand_distr::{
    Beta, Binomial, Cauchy, ChiSquared, Distribution, Exp, FisherF, Gamma, LogNormal, Normal,
    Poisson, StudentT, Uniform, Weibull,
};
use serde::Deserialize;
use std::fmt::Display;

/// The parameters of a probability distribution, as read from an input file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistributionSpec {
    /// Always returns the same value
    #[serde(alias = "point_mass")]
    Degenerate {
        /// The value returned
        value: f64,
    },
    /// Uniform over `[low, high)`
    #[serde(alias = "interval")]
    Uniform {
        /// Lower bound (inclusive)
        low: f64,
        /// Upper bound (exclusive)
        high: f64,
    },
    /// Normal distribution
    #[serde(alias = "gaussian")]
    Normal {
        /// Mean
        mean: f64,
        /// Standard deviation
        std_dev: f64,
    },
    /// Log-normal distribution
    #[serde(alias = "lognormal")]
    LogNormal {
        /// Mean of the underlying normal distribution
        mu: f64,
        /// Standard deviation of the underlying normal distribution
        sigma: f64,
    },
    /// Cauchy distribution
    Cauchy {
        /// Location of the peak
        median: f64,
        /// Half-width at half-maximum
        scale: f64,
    },
    /// Beta distribution
    Beta {
        /// First shape parameter
        alpha: f64,
        /// Second shape parameter
        beta: f64,
    },
    /// Binomial distribution
    Binomial {
        /// Number of trials
        trials: u64,
        /// Probability of success in each trial
        success: f64,
    },
    /// Poisson distribution
    Poisson {
        /// Expected number of events
        lambda: f64,
    },
    /// Chi-squared distribution
    #[serde(alias = "chisquared")]
    ChiSquared {
        /// Degrees of freedom
        dof: f64,
    },
    /// Exponential distribution
    Exponential {
        /// Rate parameter
        lambda: f64,
    },
    /// Gamma distribution
    Gamma {
        /// Shape parameter
        shape: f64,
        /// Scale parameter
        scale: f64,
    },
    /// Weibull distribution
    Weibull {
        /// Scale parameter
        scale: f64,
        /// Shape parameter
        shape: f64,
    },
    /// Student's t distribution
    #[serde(alias = "student")]
    StudentT {
        /// Degrees of freedom
        dof: f64,
    },
    /// Fisher-Snedecor F distribution
    #[serde(alias = "snedecor")]
    FisherF {
        /// Numerator degrees of freedom
        m: f64,
        /// Denominator degrees of freedom
        n: f64,
    },
}

/// A validated distribution which can produce samples
#[derive(Debug, Clone)]
enum Sampler {
    Degenerate(f64),
    Uniform(Uniform<f64>),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    Cauchy(Cauchy<f64>),
    Beta(Beta<f64>),
    Binomial(Binomial),
    Poisson(Poisson<f64>),
    ChiSquared(ChiSquared<f64>),
    Exponential(Exp<f64>),
    Gamma(Gamma<f64>),
    Weibull(Weibull<f64>),
    StudentT(StudentT<f64>),
    FisherF(FisherF<f64>),
}

/// Produces one pseudo-random sample at a time from a configured distribution
#[derive(Debug, Clone)]
pub struct StochasticDrawSource {
    sampler: Sampler,
}

/// Convert a `rand_distr` construction error into our error type
fn invalid<E: Display>(name: &str) -> impl FnOnce(E) -> anyhow::Error + '_ {
    move |err| anyhow!("Invalid parameters for {name} distribution: {err}")
}

impl StochasticDrawSource {
    /// Validate the distribution parameters and create a new draw source
    pub fn new(spec: DistributionSpec) -> Result<Self> {
        let sampler = match spec {
            DistributionSpec::Degenerate { value } => {
                ensure!(value.is_finite(), "Degenerate distribution value must be finite");
                Sampler::Degenerate(value)
            }
            DistributionSpec::Uniform { low, high } => {
                ensure!(
                    low.is_finite() && high.is_finite() && low < high,
                    "Uniform distribution requires finite bounds with low < high"
                );
                Sampler::Uniform(Uniform::new(low, high))
            }
            DistributionSpec::Normal { mean, std_dev } => {
                Sampler::Normal(Normal::new(mean, std_dev).map_err(invalid("normal"))?)
            }
            DistributionSpec::LogNormal { mu, sigma } => {
                Sampler::LogNormal(LogNormal::new(mu, sigma).map_err(invalid("log-normal"))?)
            }
            DistributionSpec::Cauchy { median, scale } => {
                Sampler::Cauchy(Cauchy::new(median, scale).map_err(invalid("Cauchy"))?)
            }
            DistributionSpec::Beta { alpha, beta } => {
                Sampler::Beta(Beta::new(alpha, beta).map_err(invalid("beta"))?)
            }
            DistributionSpec::Binomial { trials, success } => {
                Sampler::Binomial(Binomial::new(trials, success).map_err(invalid("binomial"))?)
            }
            DistributionSpec::Poisson { lambda } => {
                Sampler::Poisson(Poisson::new(lambda).map_err(invalid("Poisson"))?)
            }
            DistributionSpec::ChiSquared { dof } => {
                Sampler::ChiSquared(ChiSquared::new(dof).map_err(invalid("chi-squared"))?)
            }
            DistributionSpec::Exponential { lambda } => {
                Sampler::Exponential(Exp::new(lambda).map_err(invalid("exponential"))?)
            }
            DistributionSpec::Gamma { shape, scale } => {
                Sampler::Gamma(Gamma::new(shape, scale).map_err(invalid("gamma"))?)
            }
            DistributionSpec::Weibull { scale, shape } => {
                Sampler::Weibull(Weibull::new(scale, shape).map_err(invalid("Weibull"))?)
            }
            DistributionSpec::StudentT { dof } => {
                Sampler::StudentT(StudentT::new(dof).map_err(invalid("Student's t"))?)
            }
            DistributionSpec::FisherF { m, n } => {
                Sampler::FisherF(FisherF::new(m, n).map_err(invalid("F"))?)
            }
        };

        Ok(Self { sampler })
    }

    /// Draw a single sample
    #[allow(clippy::cast_precision_loss)]
    pub fn draw_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match &self.sampler {
            Sampler::Degenerate(value) => *value,
            Sampler::Uniform(d) => d.sample(rng),
            Sampler::Normal(d) => d.sample(rng),
            Sampler::LogNormal(d) => d.sample(rng),
            Sampler::Cauchy(d) => d.sample(rng),
            Sampler::Beta(d) => d.sample(rng),
            Sampler::Binomial(d) => d.sample(rng) as f64,
            Sampler::Poisson(d) => d.sample(rng),
            Sampler::ChiSquared(d) => d.sample(rng),
            Sampler::Exponential(d) => d.sample(rng),
            Sampler::Gamma(d) => d.sample(rng),
            Sampler::Weibull(d) => d.sample(rng),
            Sampler::StudentT(d) => d.sample(rng),
            Sampler::FisherF(d) => d.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn draws(spec: DistributionSpec, seed: u64, n: usize) -> Vec<f64> {
        let source = StochasticDrawSource::new(spec).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| source.draw_sample(&mut rng)).collect()
    }

    #[test]
    fn test_degenerate_always_same_value() {
        let samples = draws(DistributionSpec::Degenerate { value: 3.5 }, 1, 10);
        assert!(samples.iter().all(|x| *x == 3.5));
    }

    #[test]
    fn test_uniform_within_bounds() {
        let samples = draws(
            DistributionSpec::Uniform {
                low: 10.0,
                high: 20.0,
            },
            7,
            1000,
        );
        assert!(samples.iter().all(|x| (10.0..20.0).contains(x)));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let spec = DistributionSpec::Normal {
            mean: 50.0,
            std_dev: 5.0,
        };
        assert_eq!(draws(spec.clone(), 42, 20), draws(spec.clone(), 42, 20));
        assert_ne!(draws(spec.clone(), 42, 20), draws(spec, 43, 20));
    }

    #[test]
    fn test_normal_sample_mean() {
        let samples = draws(
            DistributionSpec::Normal {
                mean: 50.0,
                std_dev: 5.0,
            },
            3,
            10_000,
        );
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 50.0).abs() < 0.5, "sample mean was {mean}");
    }

    #[test]
    fn test_binomial_samples_are_counts() {
        let samples = draws(
            DistributionSpec::Binomial {
                trials: 10,
                success: 0.3,
            },
            5,
            200,
        );
        assert!(samples.iter().all(|x| x.fract() == 0.0 && (0.0..=10.0).contains(x)));
    }

    #[rstest]
    #[case(DistributionSpec::Degenerate { value: f64::NAN })]
    #[case(DistributionSpec::Uniform { low: 2.0, high: 1.0 })]
    #[case(DistributionSpec::Uniform { low: 1.0, high: 1.0 })]
    #[case(DistributionSpec::Normal { mean: 0.0, std_dev: f64::NAN })]
    #[case(DistributionSpec::Beta { alpha: 0.0, beta: 1.0 })]
    #[case(DistributionSpec::Binomial { trials: 5, success: 1.5 })]
    #[case(DistributionSpec::Poisson { lambda: -1.0 })]
    #[case(DistributionSpec::Exponential { lambda: -2.0 })]
    #[case(DistributionSpec::Gamma { shape: -1.0, scale: 1.0 })]
    fn test_invalid_parameters(#[case] spec: DistributionSpec) {
        assert!(StochasticDrawSource::new(spec).is_err());
    }

    #[test]
    fn test_deserialise_spec() {
        let spec: DistributionSpec = toml::from_str(
            "type = \"gaussian\"
mean = 2.0
std_dev = 0.5",
        )
        .unwrap();
        assert_eq!(
            spec,
            DistributionSpec::Normal {
                mean: 2.0,
                std_dev: 0.5
            }
        );

        let spec: DistributionSpec = toml::from_str("type = \"snedecor\"\nm = 3.0\nn = 4.0").unwrap();
        assert_eq!(spec, DistributionSpec::FisherF { m: 3.0, n: 4.0 });

        assert!(toml::from_str::<DistributionSpec>("type = \"zipf\"").is_err());
    }
}
