//! Seedable 2D Perlin gradient noise with fractal (fBm) layering.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Deterministic 2D gradient noise.
///
/// The permutation table is shuffled from the seed once at construction;
/// evaluation is a pure function of the coordinates afterward. Output is a
/// smooth band roughly in [0, 1], continuous across integer lattice lines.
pub struct Perlin {
    perm: [u8; 512],
}

impl Perlin {
    /// Builds the permutation table from a seed.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut p: [u8; 256] = std::array::from_fn(|i| i as u8);
        // Fisher-Yates over the 256 base entries.
        for i in (1..256).rev() {
            let j = rng.random_range(0..=i);
            p.swap(i, j);
        }
        // Duplicate into 512 entries so corner hashing never wraps mid-lookup.
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = p[i & 255];
        }
        Self { perm }
    }

    // Quintic fade; zero first and second derivatives at t = 0 and t = 1.
    #[inline]
    fn fade(t: f32) -> f32 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    #[inline]
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + t * (b - a)
    }

    // Dot product with one of eight gradient directions picked by the hash.
    #[inline]
    fn grad(hash: u8, x: f32, y: f32) -> f32 {
        match hash & 7 {
            0 => x + y,
            1 => x - y,
            2 => -x + y,
            3 => -x - y,
            4 => x,
            5 => -x,
            6 => y,
            _ => -y,
        }
    }

    /// Single-octave noise at `(x, y)`.
    pub fn noise(&self, x: f32, y: f32) -> f32 {
        let xi = (x.floor() as i32 & 255) as usize;
        let yi = (y.floor() as i32 & 255) as usize;
        let xf = x - x.floor();
        let yf = y - y.floor();
        let u = Self::fade(xf);
        let v = Self::fade(yf);

        let aa = self.perm[self.perm[xi] as usize + yi];
        let ab = self.perm[self.perm[xi] as usize + yi + 1];
        let ba = self.perm[self.perm[xi + 1] as usize + yi];
        let bb = self.perm[self.perm[xi + 1] as usize + yi + 1];

        let x1 = Self::lerp(
            Self::grad(aa, xf, yf),
            Self::grad(ba, xf - 1.0, yf),
            u,
        );
        let x2 = Self::lerp(
            Self::grad(ab, xf, yf - 1.0),
            Self::grad(bb, xf - 1.0, yf - 1.0),
            u,
        );
        let raw = Self::lerp(x1, x2, v);

        0.5 + 0.5 * raw * std::f32::consts::FRAC_1_SQRT_2
    }

    /// Fractal Brownian motion: `octaves` layers sampled at doubling
    /// frequency, weighted by `persistence^i`, divided by the weight sum so
    /// amplitude stays octave-count-invariant.
    ///
    /// With `octaves == 1` this is exactly [`noise`] for any persistence.
    ///
    /// [`noise`]: Perlin::noise
    pub fn fbm(&self, x: f32, y: f32, octaves: u32, persistence: f32) -> f32 {
        debug_assert!(octaves >= 1, "fbm needs at least one octave");
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut max_amplitude = 0.0;
        let mut frequency = 1.0;

        for _ in 0..octaves {
            total += self.noise(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        total / max_amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_octave_matches_base_noise() {
        let perlin = Perlin::new(42);
        for &(x, y) in &[(0.3, 0.7), (12.5, -4.2), (100.01, 250.99)] {
            for &persistence in &[0.5, 1.0, 8.0] {
                assert_eq!(perlin.fbm(x, y, 1, persistence), perlin.noise(x, y));
            }
        }
    }

    #[test]
    fn test_determinism_per_seed() {
        let a = Perlin::new(1234);
        let b = Perlin::new(1234);
        assert_eq!(a.fbm(10.5, -3.7, 4, 0.5), b.fbm(10.5, -3.7, 4, 0.5));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = Perlin::new(1);
        let b = Perlin::new(2);
        assert_ne!(a.noise(0.37, 0.81), b.noise(0.37, 0.81));
    }

    #[test]
    fn test_output_band() {
        let perlin = Perlin::new(7);
        for i in 0..200 {
            let x = i as f32 * 0.173;
            let y = i as f32 * 0.311;
            let v = perlin.fbm(x, y, 6, 0.5);
            assert!((-0.1..=1.1).contains(&v), "fbm value {} out of band", v);
        }
    }

    #[test]
    fn test_continuity_across_lattice_lines() {
        let perlin = Perlin::new(99);
        let eps = 1e-4;
        for &x in &[0.0f32, 1.0, 17.0, 255.0, 256.0] {
            let left = perlin.noise(x - eps, 0.5);
            let right = perlin.noise(x + eps, 0.5);
            assert!(
                (left - right).abs() < 1e-2,
                "discontinuity at x = {}: {} vs {}",
                x,
                left,
                right
            );
        }
    }

    #[test]
    fn test_continuity_small_steps() {
        let perlin = Perlin::new(3);
        let base = perlin.fbm(5.3, 2.1, 4, 0.5);
        for &eps in &[1e-2f32, 1e-3, 1e-4] {
            let delta = (perlin.fbm(5.3 + eps, 2.1, 4, 0.5) - base).abs();
            // Step sizes shrink by 10x; the delta must shrink with them.
            assert!(delta < eps * 100.0);
        }
    }
}
