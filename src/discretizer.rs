// discretizer.rs

/// Number of occupancy buckets. Bucket 9 also catches readings at or above 1.0.
pub const OCCUPANCY_BUCKETS: u32 = 10;

/// Number of time-on-phase buckets.
pub const DURATION_BUCKETS: u32 = 9;

/// Exclusive upper bounds of occupancy buckets 0..=8.
pub const OCCUPANCY_UPPER_BOUNDS: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

/// Inclusive upper bound (seconds) of duration bucket 0.
pub const DURATION_FIRST_BOUND: f64 = 10.0;

/// Exclusive upper bounds (seconds) of duration buckets 1..=7.
pub const DURATION_UPPER_BOUNDS: [f64; 7] = [15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0];

/// Maps an occupancy fraction to a bucket in `0..OCCUPANCY_BUCKETS`.
///
/// Buckets are half-open tenths. Anything that is not below 0.9 (including
/// transient overshoot past 1.0) saturates into the last bucket, negative
/// readings land in bucket 0.
pub fn bucket_occupancy(occupancy: f64) -> u32 {
    OCCUPANCY_UPPER_BOUNDS
        .iter()
        .position(|&bound| occupancy < bound)
        .unwrap_or(OCCUPANCY_UPPER_BOUNDS.len()) as u32
}

/// Maps seconds spent on the current phase to a bucket in `0..DURATION_BUCKETS`.
///
/// The first bucket is closed on the right (`<= 10`), every later one is open,
/// so exactly 10 seconds is still bucket 0 while 10.0001 is bucket 1.
pub fn bucket_duration(seconds: f64) -> u32 {
    if seconds <= DURATION_FIRST_BOUND {
        return 0;
    }
    let later = DURATION_UPPER_BOUNDS
        .iter()
        .position(|&bound| seconds < bound)
        .unwrap_or(DURATION_UPPER_BOUNDS.len());
    later as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn occupancy_reference_points() {
        assert_eq!(bucket_occupancy(0.05), 0);
        assert_eq!(bucket_occupancy(0.15), 1);
        assert_eq!(bucket_occupancy(0.95), 9);
        assert_eq!(bucket_occupancy(1.5), 9);
    }

    #[test]
    fn occupancy_boundaries_are_half_open() {
        assert_eq!(bucket_occupancy(0.0), 0);
        assert_eq!(bucket_occupancy(0.1), 1);
        assert_eq!(bucket_occupancy(0.5), 5);
        assert_eq!(bucket_occupancy(0.8999), 8);
        assert_eq!(bucket_occupancy(0.9), 9);
        assert_eq!(bucket_occupancy(1.0), 9);
    }

    #[test]
    fn occupancy_saturates_out_of_range() {
        assert_eq!(bucket_occupancy(-0.3), 0);
        assert_eq!(bucket_occupancy(f64::INFINITY), 9);
        assert_eq!(bucket_occupancy(f64::NEG_INFINITY), 0);
        assert_eq!(bucket_occupancy(f64::NAN), 9);
    }

    #[test]
    fn occupancy_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut samples: Vec<f64> = (0..2_000).map(|_| rng.random_range(-0.5..1.5)).collect();
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let buckets: Vec<u32> = samples.iter().map(|&x| bucket_occupancy(x)).collect();
        assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
        assert!(buckets.iter().all(|&b| b < OCCUPANCY_BUCKETS));
    }

    #[test]
    fn duration_reference_points() {
        assert_eq!(bucket_duration(10.0), 0);
        assert_eq!(bucket_duration(10.0001), 1);
        assert_eq!(bucket_duration(44.9), 7);
        assert_eq!(bucket_duration(100.0), 8);
        assert_eq!(bucket_duration(0.0), 0);
    }

    #[test]
    fn duration_later_boundaries_are_exclusive() {
        assert_eq!(bucket_duration(14.999), 1);
        assert_eq!(bucket_duration(15.0), 2);
        assert_eq!(bucket_duration(20.0), 3);
        assert_eq!(bucket_duration(25.0), 4);
        assert_eq!(bucket_duration(30.0), 5);
        assert_eq!(bucket_duration(35.0), 6);
        assert_eq!(bucket_duration(40.0), 7);
        assert_eq!(bucket_duration(45.0), 8);
    }

    #[test]
    fn negative_durations_fall_in_first_bucket() {
        assert_eq!(bucket_duration(-5.0), 0);
        assert_eq!(bucket_duration(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn duration_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut samples: Vec<f64> = (0..2_000).map(|_| rng.random_range(-10.0..80.0)).collect();
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let buckets: Vec<u32> = samples.iter().map(|&x| bucket_duration(x)).collect();
        assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
        assert!(buckets.iter().all(|&b| b < DURATION_BUCKETS));
    }
}
