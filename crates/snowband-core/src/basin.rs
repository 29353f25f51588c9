//! Basin description: HRUs and land-cover groups.
//!
//! Immutable once the basin has been set up.

/// Land-cover group of a pixel or band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LandCover {
    Conifer,
    Deciduous,
    Open,
}

impl LandCover {
    /// Groups in arena and file order.
    pub const ALL: [LandCover; 3] = [LandCover::Conifer, LandCover::Deciduous, LandCover::Open];

    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        match self {
            LandCover::Conifer => 0,
            LandCover::Deciduous => 1,
            LandCover::Open => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LandCover::Conifer => "conifer",
            LandCover::Deciduous => "deciduous",
            LandCover::Open => "open",
        }
    }
}

/// Slope orientation, eight directions clockwise from North.
///
/// Raster codes: 1=N, 2=NE, 3=E, 4=SE, 5=S, 6=SW, 7=W, 8=NW, 0=flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aspect {
    Flat,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Aspect {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Aspect::Flat,
            1 => Aspect::North,
            2 => Aspect::NorthEast,
            3 => Aspect::East,
            4 => Aspect::SouthEast,
            5 => Aspect::South,
            6 => Aspect::SouthWest,
            7 => Aspect::West,
            8 => Aspect::NorthWest,
            _ => return None,
        })
    }

    /// Azimuth [degrees clockwise from North]. Flat surfaces report 0.
    pub fn azimuth_deg(self) -> f64 {
        match self {
            Aspect::Flat | Aspect::North => 0.0,
            Aspect::NorthEast => 45.0,
            Aspect::East => 90.0,
            Aspect::SouthEast => 135.0,
            Aspect::South => 180.0,
            Aspect::SouthWest => 225.0,
            Aspect::West => 270.0,
            Aspect::NorthWest => 315.0,
        }
    }
}

/// Hydrological response unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hru {
    /// Identifier, as found in the HRU raster.
    pub id: u32,
    /// Centroid latitude [degrees].
    pub latitude: f64,
    /// Centroid longitude [degrees].
    pub longitude: f64,
    /// Mean elevation [m].
    pub elevation: f64,
    /// Mean slope [m/m].
    pub slope: f64,
    pub aspect: Aspect,
    /// Area [m2].
    pub area: f64,
    /// Downstream reach id, if any.
    pub downstream: Option<u32>,
}

impl Hru {
    /// Flat HRU at the given position, mostly for tests and bindings.
    pub fn flat(id: u32, latitude: f64, elevation: f64, area: f64) -> Self {
        Self {
            id,
            latitude,
            longitude: 0.0,
            elevation,
            slope: 0.0,
            aspect: Aspect::Flat,
            area,
            downstream: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn land_cover_indices_follow_all() {
        for (i, lc) in LandCover::ALL.iter().enumerate() {
            assert_eq!(lc.index(), i);
        }
    }

    #[test]
    fn aspect_codes() {
        assert_eq!(Aspect::from_code(5), Some(Aspect::South));
        assert_eq!(Aspect::from_code(9), None);
        assert_eq!(Aspect::South.azimuth_deg(), 180.0);
        assert_eq!(Aspect::from_code(8).unwrap().azimuth_deg(), 315.0);
    }
}
