//! Region sources: where a region's graph comes from on a cache miss.

use std::sync::Arc;

use evr_core::PowerClass;

use crate::{ChargingStation, GraphData, NetworkResult};

/// Supplies the graph of a named region.
///
/// `Ok(None)` means "this source does not know the region"; errors are
/// reserved for a source that knows the region but failed to produce it.
pub trait RegionSource: Send + Sync {
    fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>>;
}

/// Try `self.0`, then `self.1` if the first source does not know the region.
impl<A: RegionSource, B: RegionSource> RegionSource for (A, B) {
    fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>> {
        match self.0.load_region(region)? {
            Some(data) => Ok(Some(data)),
            None => self.1.load_region(region),
        }
    }
}

/// Compiled-in sample regions: `amsterdam` and `netherlands`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRegions;

impl BuiltinRegions {
    pub const NAMES: [&'static str; 2] = ["amsterdam", "netherlands"];

    /// Ten central Amsterdam locations, thirteen roads and five chargers.
    pub fn amsterdam() -> GraphData {
        let mut g = GraphData::default();
        g.node("Amsterdam_Central", 52.3791, 4.9003)
            .node("Dam_Square",     52.3730, 4.8926)
            .node("Museumplein",    52.3579, 4.8816)
            .node("Vondelpark",     52.3567, 4.8687)
            .node("Leidseplein",    52.3641, 4.8833)
            .node("Rembrandtplein", 52.3667, 4.8950)
            .node("Jordaan",        52.3733, 4.8792)
            .node("De_Pijp",        52.3558, 4.8927)
            .node("Oost",           52.3654, 4.9023)
            .node("West",           52.3689, 4.8891);

        g.edge("Amsterdam_Central", "Dam_Square", 0.8)
            .edge("Dam_Square",        "Rembrandtplein", 0.6)
            .edge("Rembrandtplein",    "Leidseplein",    1.2)
            .edge("Leidseplein",       "Museumplein",    0.5)
            .edge("Museumplein",       "Vondelpark",     0.8)
            .edge("Leidseplein",       "Jordaan",        1.1)
            .edge("Jordaan",           "West",           0.9)
            .edge("West",              "Oost",           2.1)
            .edge("Oost",              "De_Pijp",        1.3)
            .edge("De_Pijp",           "Museumplein",    0.7)
            .edge("Amsterdam_Central", "Jordaan",        1.0)
            .edge("Dam_Square",        "West",           1.2)
            .edge("Rembrandtplein",    "Oost",           1.8);

        g.station(ChargingStation::new("CS001", 52.3676, 4.9041, PowerClass::Fast, 50.0))
            .station(ChargingStation::new("CS002", 52.3702, 4.8952, PowerClass::Standard, 22.0))
            .station(ChargingStation::new("CS003", 52.3654, 4.9023, PowerClass::Fast, 50.0))
            .station(ChargingStation::new("CS004", 52.3689, 4.8891, PowerClass::Standard, 22.0))
            .station(ChargingStation::new("CS005", 52.3721, 4.8934, PowerClass::UltraFast, 150.0));
        g
    }

    /// The Amsterdam graph plus five Dutch cities and four intercity roads.
    pub fn netherlands() -> GraphData {
        let mut g = Self::amsterdam();
        g.node("Utrecht",   52.0907, 5.1214)
            .node("Rotterdam", 51.9244, 4.4777)
            .node("The_Hague", 52.0705, 4.3007)
            .node("Eindhoven", 51.4416, 5.4697)
            .node("Groningen", 53.2194, 6.5665);

        g.edge("Amsterdam_Central", "Utrecht",   35.0)
            .edge("Amsterdam_Central", "The_Hague", 55.0)
            .edge("Utrecht",           "Rotterdam", 65.0)
            .edge("The_Hague",         "Rotterdam", 25.0);
        g
    }
}

impl RegionSource for BuiltinRegions {
    fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>> {
        Ok(match region.to_ascii_lowercase().as_str() {
            "amsterdam"   => Some(Self::amsterdam()),
            "netherlands" => Some(Self::netherlands()),
            _ => None,
        })
    }
}

impl<T: RegionSource + ?Sized> RegionSource for Box<T> {
    fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>> {
        (**self).load_region(region)
    }
}

impl<T: RegionSource + ?Sized> RegionSource for Arc<T> {
    fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>> {
        (**self).load_region(region)
    }
}
