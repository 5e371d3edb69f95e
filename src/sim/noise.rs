//! Coherent gradient noise for toughness variation
//!
//! Classic 2D gradient noise over a 256-entry permutation table, smoothed with
//! the quintic fade so first and second derivatives vanish at lattice lines,
//! plus fractal octave summation (fBm).

use serde::{Deserialize, Serialize};

use crate::settings::NoiseSettings;

/// Park–Miller minimal standard generator modulus (2³¹ − 1)
const LCG_MODULUS: u64 = 2_147_483_647;
const LCG_MULTIPLIER: u64 = 16_807;

/// Seeded permutation table, doubled so corner hashes never wrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    table: [u8; 512],
}

impl Permutation {
    /// Fisher–Yates shuffle of 0..=255 driven by a Park–Miller sequence
    pub fn new(seed: u64) -> Self {
        let mut p = [0u8; 256];
        for (i, v) in p.iter_mut().enumerate() {
            *v = i as u8;
        }

        // State must stay in [1, m-1]
        let mut s = seed % (LCG_MODULUS - 1) + 1;
        let mut next = || {
            s = s * LCG_MULTIPLIER % LCG_MODULUS;
            (s - 1) as f64 / (LCG_MODULUS - 2) as f64
        };
        for i in (1..256).rev() {
            let j = ((next() * (i + 1) as f64) as usize).min(i);
            p.swap(i, j);
        }

        let mut table = [0u8; 512];
        table[..256].copy_from_slice(&p);
        table[256..].copy_from_slice(&p);
        Self { table }
    }

    #[inline]
    fn at(&self, i: usize) -> usize {
        self.table[i] as usize
    }
}

/// Quintic smoothstep: 6t⁵ − 15t⁴ + 10t³
#[inline]
pub fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Dot product with one of four diagonal gradients picked by the low hash bits
#[inline]
fn grad(hash: usize, x: f32, y: f32) -> f32 {
    match hash & 3 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        _ => -x - y,
    }
}

/// Seeded toughness generator
#[derive(Debug, Clone, PartialEq)]
pub struct ToughnessField {
    seed: u64,
    perm: Permutation,
    params: NoiseSettings,
}

/// Serializable description of a field; the table is rebuilt from the seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub seed: u64,
    pub params: NoiseSettings,
}

impl ToughnessField {
    pub fn new(seed: u64, params: NoiseSettings) -> Self {
        Self {
            seed,
            perm: Permutation::new(seed),
            params,
        }
    }

    pub fn from_spec(spec: &FieldSpec) -> Self {
        Self::new(spec.seed, spec.params.clone())
    }

    pub fn spec(&self) -> FieldSpec {
        FieldSpec {
            seed: self.seed,
            params: self.params.clone(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> &NoiseSettings {
        &self.params
    }

    /// Single-octave gradient noise in [-1, 1]
    pub fn noise2d(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = (x0 as i32 & 255) as usize;
        let yi = (y0 as i32 & 255) as usize;
        let xf = x - x0;
        let yf = y - y0;

        let u = fade(xf);
        let v = fade(yf);

        let p = &self.perm;
        let aa = p.at(p.at(xi) + yi);
        let ab = p.at(p.at(xi) + yi + 1);
        let ba = p.at(p.at(xi + 1) + yi);
        let bb = p.at(p.at(xi + 1) + yi + 1);

        let x1 = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
        let x2 = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);
        lerp(x1, x2, v).clamp(-1.0, 1.0)
    }

    /// Fractal sum of `octaves` layers, normalized by total amplitude
    pub fn fbm(&self, x: f32, y: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves.max(1) {
            total += amplitude * self.noise2d(x * frequency, y * frequency);
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        total / max_amplitude
    }

    /// Noise at a grid cell using the configured scale and octaves
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let p = &self.params;
        self.fbm(x * p.scale, y * p.scale, p.octaves, p.persistence, p.lacunarity)
    }

    /// Initial toughness for a cell: noise remapped to `base ± amplitude`
    pub fn toughness_at(&self, x: i32, y: i32) -> i32 {
        let n = self.sample(x as f32, y as f32);
        let t = (n * self.params.amplitude + self.params.base).round() as i32;
        t.max(1)
    }
}
