use rand::Rng;
use shared::{Vector2, SPAWN_X_RANGE, SPAWN_Y_RANGE, WORLD_WIDTH};
use uuid::Uuid;

// Fresh opaque id for entities and connections
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// Random player spawn point inside the spawn area
pub fn random_spawn<R: Rng>(rng: &mut R) -> Vector2 {
    Vector2::new(
        rng.gen_range(SPAWN_X_RANGE.0..=SPAWN_X_RANGE.1),
        rng.gen_range(SPAWN_Y_RANGE.0..=SPAWN_Y_RANGE.1),
    )
}

// Random horizontal start for an enemy wave
pub fn random_wave_x<R: Rng>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..WORLD_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_spawn_stays_in_area() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let spawn = random_spawn(&mut rng);
            assert!(spawn.x >= SPAWN_X_RANGE.0 && spawn.x <= SPAWN_X_RANGE.1);
            assert!(spawn.y >= SPAWN_Y_RANGE.0 && spawn.y <= SPAWN_Y_RANGE.1);
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let first = random_spawn(&mut StdRng::seed_from_u64(42));
        let second = random_spawn(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
        let x = random_wave_x(&mut StdRng::seed_from_u64(42));
        assert!((0.0..WORLD_WIDTH).contains(&x));
    }
}
