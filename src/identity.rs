use nonogrid_core::random_id;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

use crate::persisted_store::PersistedStore;

pub const USER_ID_LEN: usize = 8;

const FRUITS: &[&str] = &[
    "Apple", "Apricot", "Banana", "Blueberry", "Cherry", "Coconut", "Cranberry", "Date", "Fig",
    "Grape", "Guava", "Kiwi", "Lemon", "Lime", "Lychee", "Mango", "Melon", "Nectarine", "Orange",
    "Papaya", "Peach", "Pear", "Persimmon", "Pineapple", "Plum", "Pomegranate", "Raspberry",
    "Strawberry", "Tangerine", "Watermelon",
];

/// Participant colors; black, white and gray are kept for the board itself.
const PALETTE: &[&str] = &[
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#9a6324",
    "#800000", "#469990", "#000075", "#bfef45",
];

/// The anonymous identity this browser plays under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUser {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl LocalUser {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let fruit = FRUITS.choose(rng).copied().unwrap_or("Fruit");
        let color = PALETTE.choose(rng).copied().unwrap_or("#4363d8");
        Self {
            id: random_id(rng, USER_ID_LEN),
            name: format!("Anonymous {fruit}"),
            color: color.to_string(),
        }
    }
}

/// Loads the stored identity, or creates and stores a new one.
pub fn load_or_create_user<R: Rng + ?Sized>(store: &PersistedStore, rng: &mut R) -> LocalUser {
    if let Some(record) = store.identity() {
        return LocalUser {
            id: record.id,
            name: record.name,
            color: record.color,
        };
    }
    let user = LocalUser::random(rng);
    store.save_identity(&user.id, &user.name, &user.color);
    info!(user_id = %user.id, name = %user.name, "created local identity");
    user
}
