use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

pub const DEFAULT_HORSE_COUNT: usize = 20;
pub const FALLBACK_COLOR: &str = "#808080";

const HORSE_NAMES: [&str; 20] = [
    "Thunder", "Lightning", "Storm", "Shadow", "Blaze", "Spirit", "Midnight", "Champion",
    "Victory", "Phoenix", "Apollo", "Zeus", "Athena", "Hercules", "Pegasus", "Flash", "Rocket",
    "Comet", "Star", "Legend",
];

const HORSE_COLORS: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B500", "#FF85A2", "#5DADE2", "#58D68D", "#EC7063", "#AF7AC5", "#F39C12", "#3498DB",
    "#1ABC9C", "#E74C3C", "#9B59B6", "#F1C40F",
];

/// * `id` - Unique horse number, starting at 1
/// * `name` - Horse name, e.g. Thunder
/// * `condition` - (-) Fitness in [1, 100], higher condition means higher base speed
/// * `color` - Hex color used to display the horse, e.g. #FF6B6B
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Horse {
    pub id: u32,
    pub name: String,
    pub condition: u8,
    pub color: String,
}

/// generate_horses creates a roster of `count` horses with ids 1..=count. Names and colors are
/// drawn from fixed palettes without replacement in a new random order on every call.
pub fn generate_horses<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Horse> {
    let mut names = HORSE_NAMES.to_vec();
    let mut colors = HORSE_COLORS.to_vec();
    names.shuffle(rng);
    colors.shuffle(rng);

    (0..count)
        .map(|idx| Horse {
            id: idx as u32 + 1,
            name: names
                .get(idx)
                .map(|name| (*name).to_owned())
                .unwrap_or_else(|| format!("Horse {}", idx + 1)),
            condition: rng.gen_range(1..=100),
            color: colors.get(idx).copied().unwrap_or(FALLBACK_COLOR).to_owned(),
        })
        .collect()
}

/// select_horses returns up to `count` horses drawn without replacement from `horses` by
/// shuffling a copy and taking its head.
pub fn select_horses<R: Rng + ?Sized>(count: usize, horses: &[Horse], rng: &mut R) -> Vec<Horse> {
    let mut pool = horses.to_vec();
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}
