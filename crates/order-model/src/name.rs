//! Short, speakable order names.
//!
//! Names are short common words so operators can read them off a console and
//! type them back into `redo` or `delete`. The random source is supplied by
//! the caller, so a seeded generator gives a reproducible sequence.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{OrderError, OrderResult};
use crate::store::OrderStore;

const WORDS: &[&str] = &[
    "acid", "aged", "amber", "arch", "army", "atom", "axle", "bark", "barn", "bead", "beam",
    "bell", "bolt", "bone", "brim", "buoy", "cape", "cask", "cave", "chip", "clay", "claw",
    "coal", "coil", "cold", "cone", "cork", "crab", "crow", "cube", "dawn", "deck", "deer",
    "dial", "disc", "dock", "dome", "dove", "drum", "dune", "dusk", "echo", "edge", "elm",
    "fern", "fig", "film", "fish", "flag", "foam", "fog", "fork", "fox", "frog", "gate",
    "gear", "glow", "goat", "gold", "gulf", "gust", "hail", "hare", "harp", "hawk", "haze",
    "helm", "hill", "hive", "hood", "horn", "hull", "iris", "iron", "isle", "jade", "jar",
    "jet", "kelp", "kiln", "kite", "knot", "lace", "lake", "lamp", "lark", "lava", "leaf",
    "lens", "lily", "lime", "lynx", "mast", "maze", "mesa", "mill", "mint", "mist", "mole",
    "moon", "moss", "moth", "nail", "nest", "node", "oak", "oar", "opal", "orb", "owl",
    "palm", "pear", "peak", "pine", "pipe", "plum", "pond", "port", "quay", "raft", "rail",
    "rain", "reed", "reef", "rice", "ring", "rock", "roof", "rope", "rose", "ruby", "rust",
    "sage", "sail", "salt", "sand", "seal", "seed", "shed", "silk", "slate", "snow", "soil",
    "star", "stem", "swan", "tide", "tile", "toad", "tuba", "tusk", "twig", "vale", "vane",
    "vase", "veil", "vine", "wasp", "wave", "weld", "well", "whey", "wick", "wind", "wing",
    "wolf", "wood", "wool", "wren", "yarn", "yolk", "yurt", "zinc", "zone", "zoom",
];

impl OrderStore {
    /// Pick an unused order name using `rng`.
    pub fn allocate_name<R: Rng + ?Sized>(&self, rng: &mut R) -> OrderResult<String> {
        WORDS
            .choose_multiple(rng, WORDS.len())
            .find(|word| !self.order_dir(word).exists())
            .map(|word| word.to_string())
            .ok_or(OrderError::NamesExhausted)
    }
}
