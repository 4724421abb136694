use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Number of slots on the track.
pub const BOARD_SIZE: usize = 40;

/// Track indices that always hold fixed special tiles.
pub const SPECIAL_SLOTS: [usize; 4] = [0, 10, 20, 30];

/// What occupies a board slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Street,
    Utility,
    Railroad,
    Special,
    Tax,
    Chance,
    Jail,
    Start,
    Parking,
    GoToJail,
}

/// One of the 40 board tiles. The board is fixed after generation; only
/// `owner_id` mutates, and it transitions from absent to set exactly once
/// (no resale or repossession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub address: String,
    pub kind: TileKind,
    pub price: Option<i64>,
    pub rent: Option<i64>,
    pub owner_id: Option<PlayerId>,
    /// Color-set label for streets.
    pub group: Option<String>,
}

impl Property {
    /// A street that can currently be bought.
    pub fn is_purchasable(&self) -> bool {
        self.kind == TileKind::Street && self.owner_id.is_none()
    }
}

/// Maps a city name to the 40-tile track. External collaborator seam: the
/// shipped generator uses a fixed street list, but an implementation may
/// consult a place-lookup service as long as it returns exactly
/// [`BOARD_SIZE`] tiles with the special slots fixed.
pub trait BoardGenerator: Send + Sync {
    fn generate(&self, city: &str) -> Vec<Property>;
}

/// Street names used when no place-lookup backend is wired in.
const STREET_NAMES: [&str; 25] = [
    "Main St",
    "First Ave",
    "Broadway",
    "Market St",
    "Park Ave",
    "Oak St",
    "Pine St",
    "Maple Ave",
    "Cedar Ln",
    "Elm St",
    "Washington St",
    "Lakeview Dr",
    "Hillside Ave",
    "Sunset Blvd",
    "River Rd",
    "High St",
    "Church St",
    "School St",
    "Bridge St",
    "Mill St",
    "Garden St",
    "Forest Dr",
    "Spring St",
    "Valley Rd",
    "North St",
];

/// Color group and price ladder by track index.
fn street_group_and_price(index: usize) -> (&'static str, i64) {
    match index {
        6..=9 => ("light_blue", 100),
        11..=14 => ("pink", 140),
        16..=19 => ("orange", 180),
        21..=24 => ("red", 220),
        26..=29 => ("yellow", 260),
        31..=34 => ("green", 300),
        36..=39 => ("dark_blue", 350),
        // Indices 1-5 and the range boundaries fall back to the base group.
        _ => ("brown", 60),
    }
}

/// Offline board generator: special tiles at 0/10/20/30, purchasable
/// streets everywhere else, named from the fixed street list and priced by
/// the color-group ladder. Rent derives from price (one tenth).
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBoardGenerator;

impl BoardGenerator for LocalBoardGenerator {
    fn generate(&self, city: &str) -> Vec<Property> {
        let mut board = Vec::with_capacity(BOARD_SIZE);
        let mut street_idx = 0usize;

        for i in 0..BOARD_SIZE {
            let special = match i {
                0 => Some(("INÍCIO", TileKind::Start)),
                10 => Some(("PRISÃO", TileKind::Jail)),
                20 => Some(("FERIADO", TileKind::Parking)),
                30 => Some(("VÁ PARA A PRISÃO", TileKind::GoToJail)),
                _ => None,
            };

            let tile = match special {
                Some((name, kind)) => Property {
                    id: format!("prop_{i}"),
                    name: name.to_string(),
                    address: city.to_string(),
                    kind,
                    price: None,
                    rent: None,
                    owner_id: None,
                    group: None,
                },
                None => {
                    let (group, price) = street_group_and_price(i);
                    let name = STREET_NAMES[street_idx % STREET_NAMES.len()];
                    street_idx += 1;
                    Property {
                        id: format!("prop_{i}"),
                        name: name.to_string(),
                        address: city.to_string(),
                        kind: TileKind::Street,
                        price: Some(price),
                        rent: Some(price / 10),
                        owner_id: None,
                        group: Some(group.to_string()),
                    }
                },
            };
            board.push(tile);
        }

        board
    }
}
