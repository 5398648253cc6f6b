//! Heritable organism traits and their mutation.

use crate::config::{Bound, ColorBounds, TraitBounds};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Colour in hue/saturation/luminance space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    /// Degrees in `[0, 360)`
    pub hue: f32,
    pub saturation: f32,
    pub luminance: f32,
}

impl Hsl {
    pub fn random<R: Rng + ?Sized>(bounds: &ColorBounds, rng: &mut R) -> Self {
        Self {
            hue: rng.gen_range(0.0..360.0),
            saturation: sample(&bounds.saturation, rng),
            luminance: sample(&bounds.luminance, rng),
        }
    }

    /// Small perceptual drift; hue wraps, the rest stay in range
    pub fn mutated<R: Rng + ?Sized>(&self, bounds: &ColorBounds, rng: &mut R) -> Self {
        let hue_shift = if bounds.hue_step > 0.0 {
            rng.gen_range(-bounds.hue_step..=bounds.hue_step)
        } else {
            0.0
        };
        let hue = (self.hue + hue_shift).rem_euclid(360.0);
        Self {
            hue: if hue >= 360.0 { 0.0 } else { hue },
            saturation: perturb(self.saturation, &bounds.saturation, rng),
            luminance: perturb(self.luminance, &bounds.luminance, rng),
        }
    }

    /// 8-bit RGB for renderers
    pub fn to_rgb(&self) -> [u8; 3] {
        let s = self.saturation.clamp(0.0, 1.0);
        let l = self.luminance.clamp(0.0, 1.0);
        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        let to_byte = |c: f32| ((c + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        [to_byte(r), to_byte(g), to_byte(b)]
    }
}

/// Heritable per-organism parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub max_size: f32,
    /// Health handed to a child, and paid by the parent
    pub spawn_health: f32,
    pub min_health_to_spawn: f32,
    pub min_cycles_between_spawns: u32,
    pub chance_to_mutate_decision_tree: f32,
    pub color: Hsl,
    pub ideal_ph: f32,
    pub ph_tolerance: f32,
    /// Health gained per cycle at the ideal ph, lost far from it
    pub ph_growth_effect: f32,
}

impl Traits {
    /// Uniform draw within the global bounds
    pub fn random<R: Rng + ?Sized>(bounds: &TraitBounds, rng: &mut R) -> Self {
        let mut traits = Self {
            max_size: sample(&bounds.max_size, rng),
            spawn_health: sample(&bounds.spawn_health, rng),
            min_health_to_spawn: sample(&bounds.min_health_to_spawn, rng),
            min_cycles_between_spawns: sample(&bounds.min_cycles_between_spawns, rng).round() as u32,
            chance_to_mutate_decision_tree: sample(&bounds.chance_to_mutate_decision_tree, rng),
            color: Hsl::random(&bounds.color, rng),
            ideal_ph: sample(&bounds.ideal_ph, rng),
            ph_tolerance: sample(&bounds.ph_tolerance, rng),
            ph_growth_effect: sample(&bounds.ph_growth_effect, rng),
        };
        traits.normalize();
        traits
    }

    /// Copy of these traits with every field nudged by at most its step
    pub fn inherit<R: Rng + ?Sized>(&self, bounds: &TraitBounds, rng: &mut R) -> Self {
        let cycles = perturb(
            self.min_cycles_between_spawns as f32,
            &bounds.min_cycles_between_spawns,
            rng,
        );
        let mut child = Self {
            max_size: perturb(self.max_size, &bounds.max_size, rng),
            spawn_health: perturb(self.spawn_health, &bounds.spawn_health, rng),
            min_health_to_spawn: perturb(self.min_health_to_spawn, &bounds.min_health_to_spawn, rng),
            min_cycles_between_spawns: cycles.round() as u32,
            chance_to_mutate_decision_tree: perturb(
                self.chance_to_mutate_decision_tree,
                &bounds.chance_to_mutate_decision_tree,
                rng,
            ),
            color: self.color.mutated(&bounds.color, rng),
            ideal_ph: perturb(self.ideal_ph, &bounds.ideal_ph, rng),
            ph_tolerance: perturb(self.ph_tolerance, &bounds.ph_tolerance, rng),
            ph_growth_effect: perturb(self.ph_growth_effect, &bounds.ph_growth_effect, rng),
        };
        child.normalize();
        child
    }

    /// Restore `spawn_health <= min_health_to_spawn <= max_size`
    fn normalize(&mut self) {
        self.min_health_to_spawn = self.min_health_to_spawn.min(self.max_size);
        self.spawn_health = self.spawn_health.min(self.min_health_to_spawn);
    }
}

fn sample<R: Rng + ?Sized>(bound: &Bound, rng: &mut R) -> f32 {
    if bound.max > bound.min {
        rng.gen_range(bound.min..=bound.max)
    } else {
        bound.min
    }
}

fn perturb<R: Rng + ?Sized>(value: f32, bound: &Bound, rng: &mut R) -> f32 {
    let delta = if bound.step > 0.0 {
        rng.gen_range(-bound.step..=bound.step)
    } else {
        0.0
    };
    bound.clamp(value + delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn within(value: f32, bound: &Bound) -> bool {
        value >= bound.min && value <= bound.max
    }

    fn assert_ordered(traits: &Traits) {
        assert!(traits.spawn_health <= traits.min_health_to_spawn);
        assert!(traits.min_health_to_spawn <= traits.max_size);
    }

    #[test]
    fn test_random_traits_in_bounds() {
        let bounds = TraitBounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..500 {
            let traits = Traits::random(&bounds, &mut rng);
            assert_ordered(&traits);
            assert!(within(traits.max_size, &bounds.max_size));
            assert!(within(traits.spawn_health, &bounds.spawn_health));
            assert!(within(traits.ideal_ph, &bounds.ideal_ph));
            assert!(within(traits.ph_tolerance, &bounds.ph_tolerance));
            assert!(within(traits.color.saturation, &bounds.color.saturation));
        }
    }

    #[test]
    fn test_inherit_steps_are_bounded() {
        let bounds = TraitBounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let parent = Traits::random(&bounds, &mut rng);

        for _ in 0..500 {
            let child = parent.inherit(&bounds, &mut rng);
            assert_ordered(&child);
            assert!((child.max_size - parent.max_size).abs() <= bounds.max_size.step + 1e-4);
            assert!((child.ideal_ph - parent.ideal_ph).abs() <= bounds.ideal_ph.step + 1e-4);
            let cycles = child.min_cycles_between_spawns as f32 - parent.min_cycles_between_spawns as f32;
            assert!(cycles.abs() <= bounds.min_cycles_between_spawns.step + 1.0);
            assert!(within(child.chance_to_mutate_decision_tree, &bounds.chance_to_mutate_decision_tree));
        }
    }

    #[test]
    fn test_long_drift_stays_in_bounds() {
        let bounds = TraitBounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut traits = Traits::random(&bounds, &mut rng);
        for _ in 0..5000 {
            traits = traits.inherit(&bounds, &mut rng);
        }
        assert_ordered(&traits);
        assert!(within(traits.max_size, &bounds.max_size));
        assert!(within(traits.min_health_to_spawn, &bounds.min_health_to_spawn));
        assert!(traits.color.hue >= 0.0 && traits.color.hue < 360.0);
        assert!(within(traits.color.luminance, &bounds.color.luminance));
    }

    #[test]
    fn test_hue_wraps() {
        let bounds = ColorBounds {
            hue_step: 30.0,
            saturation: Bound::new(0.5, 0.5, 0.0),
            luminance: Bound::new(0.5, 0.5, 0.0),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let color = Hsl { hue: 359.0, saturation: 0.5, luminance: 0.5 };
        for _ in 0..100 {
            let next = color.mutated(&bounds, &mut rng);
            assert!(next.hue >= 0.0 && next.hue < 360.0);
            let diff = (next.hue - color.hue).rem_euclid(360.0);
            assert!(diff <= 30.0 + 1e-3 || diff >= 330.0 - 1e-3);
        }
    }

    #[test]
    fn test_hsl_to_rgb() {
        let red = Hsl { hue: 0.0, saturation: 1.0, luminance: 0.5 };
        assert_eq!(red.to_rgb(), [255, 0, 0]);
        let green = Hsl { hue: 120.0, saturation: 1.0, luminance: 0.5 };
        assert_eq!(green.to_rgb(), [0, 255, 0]);
        let grey = Hsl { hue: 200.0, saturation: 0.0, luminance: 0.5 };
        assert_eq!(grey.to_rgb(), [128, 128, 128]);
    }
}
