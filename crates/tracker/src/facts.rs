//! Copy used in reminder bodies.

use rand::seq::SliceRandom;

pub const WATER_FACTS: &[&str] = &[
    "Drinking water helps maintain the balance of body fluids",
    "Water helps energize muscles and prevents fatigue",
    "Water helps keep skin looking good and healthy",
    "Water helps your kidneys work properly",
    "Water helps maintain normal bowel function",
    "Drinking water can help control calories",
    "Water helps transport nutrients throughout your body",
    "Staying hydrated improves concentration and alertness",
    "Water helps regulate body temperature",
    "Drinking water can help prevent headaches",
    "Water helps lubricate and cushion joints",
    "Staying hydrated supports healthy digestion",
    "Water helps flush out toxins from your body",
    "Drinking water can boost your mood",
    "Water helps maintain healthy blood pressure",
];

pub fn random_fact() -> &'static str {
    WATER_FACTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(WATER_FACTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_fact_comes_from_the_list() {
        for _ in 0..50 {
            assert!(WATER_FACTS.contains(&random_fact()));
        }
    }
}
