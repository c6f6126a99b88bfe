//! Level → engine search parameters.

const LEVEL_DEPTH: &[(u8, u8)] = &[(1, 2), (2, 4), (4, 8), (6, 10), (8, 12), (10, 14)];
const LEVEL_SKILL: &[(u8, u8)] = &[(1, 0), (2, 4), (4, 8), (6, 12), (8, 16), (10, 20)];
const LEVEL_ELO: &[(u8, u32)] = &[
    (1, 800),
    (2, 1000),
    (4, 1300),
    (6, 1700),
    (8, 2100),
    (10, 2500),
];

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength {
    pub level: u8,
    pub depth: u8,
    pub skill_level: u8,
    pub elo: u32,
}

impl Strength {
    /// Map a level onto the tables above. Levels between table keys take the
    /// nearest key, the lower one on a tie.
    pub fn for_level(level: u8) -> Self {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
        Self {
            level,
            depth: nearest(LEVEL_DEPTH, level),
            skill_level: nearest(LEVEL_SKILL, level),
            elo: nearest(LEVEL_ELO, level),
        }
    }

    /// `setoption` lines that apply this strength.
    pub fn uci_options(&self) -> Vec<String> {
        vec![
            "setoption name UCI_LimitStrength value true".to_string(),
            format!("setoption name Skill Level value {}", self.skill_level),
            format!("setoption name UCI_Elo value {}", self.elo),
        ]
    }

    /// `setoption` lines that remove any previous strength limit.
    pub fn full_strength_options() -> Vec<String> {
        vec![
            "setoption name UCI_LimitStrength value false".to_string(),
            "setoption name Skill Level value 20".to_string(),
        ]
    }
}

fn nearest<T: Copy>(table: &[(u8, T)], level: u8) -> T {
    let mut best = table[0];
    for &(key, value) in &table[1..] {
        if key.abs_diff(level) < best.0.abs_diff(level) {
            best = (key, value);
        }
    }
    best.1
}
