//! Synthetic identities for log records.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::record::Persona;

/// Source of the synthetic content behind each log record.
pub trait RecordGenerator: Send + 'static {
    fn persona(&mut self) -> Persona;
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Hedy", "John",
    "Katherine", "Ken", "Linus", "Margaret", "Niklaus", "Radia", "Sophie", "Tim",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Berners-Lee", "Dijkstra", "Hamilton", "Hopper", "Johnson", "Knuth", "Lamarr",
    "Liskov", "Lovelace", "McCarthy", "Perlman", "Ritchie", "Shannon", "Thompson", "Turing",
    "Wilson", "Wirth",
];

const GENDERS: &[&str] = &["Female", "Male"];

/// Random personas drawn from fixed name tables.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    rng: StdRng,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, table: &[&'static str]) -> &'static str {
        table[self.rng.gen_range(0..table.len())]
    }

    fn phone(&mut self) -> String {
        format!(
            "{}-{:03}-{:04}",
            self.rng.gen_range(201..990),
            self.rng.gen_range(0..1000),
            self.rng.gen_range(0..10000)
        )
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordGenerator for RandomGenerator {
    fn persona(&mut self) -> Persona {
        let name = format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES));
        Persona {
            name,
            gender: self.pick(GENDERS).to_string(),
            phone: self.phone(),
        }
    }
}
