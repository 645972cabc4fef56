use rand::Rng;

/// Number of bundled `hugN.jpg` images.
pub const IMAGE_POOL_SIZE: u32 = 12;

/// Upper bound (exclusive) for randomly scheduled delays, in seconds.
pub const MAX_DELAY_SECS: u32 = 3600;

/// Whole-second delay drawn uniformly from `[0, max_secs)`.
pub fn random_delay<R: Rng>(rng: &mut R, max_secs: u32) -> f64 {
    if max_secs == 0 {
        return 0.0;
    }
    f64::from(rng.gen_range(0..max_secs))
}

/// Picks one of `hug1` ..= `hug{pool_size}`.
pub fn random_image_name<R: Rng>(rng: &mut R, pool_size: u32) -> String {
    let index = rng.gen_range(1..=pool_size.max(1));
    image_name(index)
}

pub fn image_name(index: u32) -> String {
    format!("hug{index}")
}

/// Every image name in a pool of `pool_size` candidates, in order.
pub fn image_pool(pool_size: u32) -> Vec<String> {
    (1..=pool_size).map(image_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delays_stay_in_range_and_vary() {
        let mut rng = StdRng::seed_from_u64(7);
        let delays: Vec<f64> = (0..1000)
            .map(|_| random_delay(&mut rng, MAX_DELAY_SECS))
            .collect();
        assert!(delays
            .iter()
            .all(|d| *d >= 0.0 && *d < f64::from(MAX_DELAY_SECS)));
        assert!(delays.iter().any(|d| *d != delays[0]));
    }

    #[test]
    fn zero_max_delay_is_immediate() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_delay(&mut rng, 0), 0.0);
    }

    #[test]
    fn image_names_come_from_the_pool() {
        let pool = image_pool(IMAGE_POOL_SIZE);
        assert_eq!(pool.len(), 12);
        assert_eq!(pool[0], "hug1");
        assert_eq!(pool[11], "hug12");

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let name = random_image_name(&mut rng, IMAGE_POOL_SIZE);
            assert!(pool.contains(&name), "unexpected image {name}");
        }
    }
}
