use serde::Deserialize;
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct TerrainId(pub u8);

/// Visual definition of one terrain type.
///
/// `texture` and `blend_mask` are atlas sheet names. Higher `dominance`
/// bleeds over lower dominance at shared edges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TerrainDef {
    pub name: SmolStr,
    pub dominance: u8,
    #[serde(default)]
    pub is_ocean: bool,
    pub texture: SmolStr,
    pub blend_mask: SmolStr,
    /// Base colour for generated placeholder textures.
    #[serde(default = "TerrainDef::default_color")]
    pub color: [u8; 3],
}

impl TerrainDef {
    pub fn new(name: &str, dominance: u8, is_ocean: bool, color: [u8; 3]) -> Self {
        Self {
            name: SmolStr::new(name),
            dominance,
            is_ocean,
            texture: SmolStr::from(format!("texture/{name}")),
            blend_mask: SmolStr::from(format!("blend/{name}")),
            color,
        }
    }

    fn default_color() -> [u8; 3] {
        [128, 128, 128]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerrainSetError {
    #[error("terrain set is empty")]
    Empty,
    #[error("terrain set holds {count} terrains, at most {max} are addressable", max = u8::MAX as usize + 1)]
    TooMany { count: usize },
    #[error("terrains {first:?} and {second:?} share dominance {dominance}")]
    DuplicateDominance {
        dominance: u8,
        first: SmolStr,
        second: SmolStr,
    },
    #[error("terrain name {0:?} is used twice")]
    DuplicateName(SmolStr),
    #[error("terrain set has no ocean terrain")]
    MissingOcean,
}

/// Validated terrain definitions indexed by [`TerrainId`] and by dominance rank.
///
/// Ranks are unique, so each rank names exactly one texture and blend-mask
/// pair. The highest rank bounds the dominance loop of tile recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainSet {
    terrains: Vec<TerrainDef>,
    // by_rank.len() == max_dominance + 1
    by_rank: Vec<Option<TerrainId>>,
    max_dominance: u8,
}

impl TerrainSet {
    pub fn new(terrains: Vec<TerrainDef>) -> Result<Self, TerrainSetError> {
        if terrains.is_empty() {
            return Err(TerrainSetError::Empty);
        }
        if terrains.len() > u8::MAX as usize + 1 {
            return Err(TerrainSetError::TooMany {
                count: terrains.len(),
            });
        }
        if !terrains.iter().any(|terrain| terrain.is_ocean) {
            return Err(TerrainSetError::MissingOcean);
        }

        let max_dominance = terrains
            .iter()
            .map(|terrain| terrain.dominance)
            .max()
            .unwrap_or_default();
        let mut by_rank: Vec<Option<TerrainId>> = vec![None; max_dominance as usize + 1];
        for (index, terrain) in terrains.iter().enumerate() {
            if terrains[..index].iter().any(|other| other.name == terrain.name) {
                return Err(TerrainSetError::DuplicateName(terrain.name.clone()));
            }
            let slot = &mut by_rank[terrain.dominance as usize];
            if let Some(existing) = slot {
                return Err(TerrainSetError::DuplicateDominance {
                    dominance: terrain.dominance,
                    first: terrains[existing.0 as usize].name.clone(),
                    second: terrain.name.clone(),
                });
            }
            *slot = Some(TerrainId(index as u8));
        }

        Ok(Self {
            terrains,
            by_rank,
            max_dominance,
        })
    }

    /// Ocean, then land from least to most dominant.
    pub fn standard() -> Self {
        let terrains = vec![
            TerrainDef::new("ocean", 0, true, [38, 78, 140]),
            TerrainDef::new("desert", 1, false, [214, 190, 120]),
            TerrainDef::new("tundra", 2, false, [170, 176, 160]),
            TerrainDef::new("plains", 3, false, [160, 160, 70]),
            TerrainDef::new("grassland", 4, false, [84, 150, 60]),
            TerrainDef::new("swamp", 5, false, [70, 100, 80]),
            TerrainDef::new("forest", 6, false, [40, 100, 40]),
            TerrainDef::new("hills", 7, false, [130, 120, 80]),
            TerrainDef::new("mountains", 8, false, [120, 110, 110]),
        ];
        match Self::new(terrains) {
            Ok(set) => set,
            Err(error) => unreachable!("standard terrain set is valid: {error}"),
        }
    }

    /// Panics on an id outside the set; ids come from this set's own tiles.
    pub fn get(&self, id: TerrainId) -> &TerrainDef {
        &self.terrains[id.0 as usize]
    }

    pub fn id(&self, name: &str) -> Option<TerrainId> {
        self.terrains
            .iter()
            .position(|terrain| terrain.name == name)
            .map(|index| TerrainId(index as u8))
    }

    pub fn len(&self) -> usize {
        self.terrains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terrains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TerrainId, &TerrainDef)> {
        self.terrains
            .iter()
            .enumerate()
            .map(|(index, terrain)| (TerrainId(index as u8), terrain))
    }

    pub fn dominance(&self, id: TerrainId) -> u8 {
        self.get(id).dominance
    }

    pub fn is_ocean(&self, id: TerrainId) -> bool {
        self.get(id).is_ocean
    }

    pub fn max_dominance(&self) -> u8 {
        self.max_dominance
    }

    pub fn at_rank(&self, rank: u8) -> Option<TerrainId> {
        self.by_rank.get(rank as usize).copied().flatten()
    }
}
