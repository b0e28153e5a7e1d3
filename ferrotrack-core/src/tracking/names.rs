//! Human-friendly run names (`adjective-noun-NNN`).

use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "agile", "bold", "brave", "bright", "calm", "clever", "crisp", "daring", "eager", "fleet",
    "gentle", "glad", "honest", "keen", "lively", "lucky", "mellow", "nimble", "polite", "proud",
    "quiet", "rare", "rustic", "shy", "silent", "sleek", "steady", "swift", "tidy", "vivid",
    "wise", "zesty",
];

const NOUNS: &[&str] = &[
    "ant", "bass", "bear", "bee", "carp", "cat", "colt", "crab", "crane", "deer", "dove", "eel",
    "finch", "fox", "frog", "goat", "hare", "hawk", "heron", "lark", "lynx", "mole", "moth",
    "newt", "owl", "ram", "seal", "shrew", "sloth", "snail", "stag", "toad", "wren", "yak",
];

/// Generate a run name such as `swift-heron-417`.
pub fn generate_run_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("quiet");
    let noun = NOUNS.choose(rng).copied().unwrap_or("owl");
    let number: u16 = rng.gen_range(0..1000);
    format!("{adjective}-{noun}-{number}")
}
