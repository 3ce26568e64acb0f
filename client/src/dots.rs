//! Random dot placement for a fresh game

use log::debug;
use rand::Rng;
use shared::{is_valid_dot, Dot, Obstacle, DOT_SIZE};
use std::fmt;

/// Upper bound on rejection-sampling draws before the layout is declared
/// unsatisfiable.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub enum DotFieldError {
    Unsatisfiable {
        placed: usize,
        requested: usize,
        attempts: usize,
    },
}

impl fmt::Display for DotFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DotFieldError::Unsatisfiable {
                placed,
                requested,
                attempts,
            } => write!(
                f,
                "unsatisfiable dot layout: placed {} of {} dots in {} attempts",
                placed, requested, attempts
            ),
        }
    }
}

impl std::error::Error for DotFieldError {}

/// Parameters for a dot field
#[derive(Debug, Clone)]
pub struct DotFieldConfig {
    pub count: usize,
    pub width: f32,
    pub height: f32,
    pub max_attempts: usize,
}

impl DotFieldConfig {
    pub fn new(count: usize, width: f32, height: f32) -> Self {
        Self {
            count,
            width,
            height,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Places `config.count` dots by rejection sampling. Every accepted dot lies
/// inside the canvas and clear of all obstacles.
pub fn generate_dots<R: Rng + ?Sized>(
    rng: &mut R,
    config: &DotFieldConfig,
    obstacles: &[Obstacle],
) -> Result<Vec<Dot>, DotFieldError> {
    let radius = DOT_SIZE / 2.0;
    let mut dots = Vec::with_capacity(config.count);
    let mut attempts = 0;

    while dots.len() < config.count {
        if attempts >= config.max_attempts {
            return Err(DotFieldError::Unsatisfiable {
                placed: dots.len(),
                requested: config.count,
                attempts,
            });
        }
        attempts += 1;

        let x = rng.gen::<f32>() * (config.width - DOT_SIZE) + radius;
        let y = rng.gen::<f32>() * (config.height - DOT_SIZE) + radius;

        if is_valid_dot(x, y, config.width, config.height, obstacles) {
            dots.push(Dot::new(x, y));
        }
    }

    debug!("Placed {} dots in {} attempts", dots.len(), attempts);
    Ok(dots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{obstacles, CANVAS_HEIGHT, CANVAS_WIDTH, DOT_COUNT};

    fn stock_config() -> DotFieldConfig {
        DotFieldConfig::new(DOT_COUNT, CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    #[test]
    fn test_generates_exact_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let dots = generate_dots(&mut rng, &stock_config(), &obstacles()).unwrap();
        assert_eq!(dots.len(), DOT_COUNT);
    }

    #[test]
    fn test_dots_inside_bounds_and_clear_of_walls() {
        let walls = obstacles();
        let radius = DOT_SIZE / 2.0;

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let dots = generate_dots(&mut rng, &stock_config(), &walls).unwrap();

            for dot in &dots {
                assert!(dot.x >= radius && dot.x <= CANVAS_WIDTH - radius);
                assert!(dot.y >= radius && dot.y <= CANVAS_HEIGHT - radius);
                for wall in &walls {
                    assert!(!wall.overlaps(
                        dot.x - radius,
                        dot.y - radius,
                        dot.x + radius,
                        dot.y + radius
                    ));
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let first = generate_dots(&mut a, &stock_config(), &obstacles()).unwrap();
        let second = generate_dots(&mut b, &stock_config(), &obstacles()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsatisfiable_layout_fails_instead_of_hanging() {
        let cover = vec![Obstacle::new(0.0, 0.0, 100.0, 100.0, "red")];
        let mut config = DotFieldConfig::new(5, 100.0, 100.0);
        config.max_attempts = 1_000;

        let mut rng = StdRng::seed_from_u64(1);
        let err = generate_dots(&mut rng, &config, &cover).unwrap_err();

        assert_eq!(
            err,
            DotFieldError::Unsatisfiable {
                placed: 0,
                requested: 5,
                attempts: 1_000,
            }
        );
        assert!(err.to_string().contains("0 of 5"));
    }

    #[test]
    fn test_zero_dots() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = DotFieldConfig::new(0, CANVAS_WIDTH, CANVAS_HEIGHT);
        assert!(generate_dots(&mut rng, &config, &obstacles())
            .unwrap()
            .is_empty());
    }
}
