use serde::Serialize;

/// Dimensions every gridded variable is expected to carry.
pub const DIMENSIONS: [&str; 3] = ["time", "lat", "lon"];

/// One entry of the meteorological variable registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableSpec {
    pub key: &'static str,
    pub description: &'static str,
    pub units: &'static str,
    /// File stem of the monthly-mean product, without extension.
    pub stem: &'static str,
    /// Name of the data variable (or table column) inside that file.
    pub column: &'static str,
}

impl VariableSpec {
    #[inline] pub fn dimensions(&self) -> &'static [&'static str] { &DIMENSIONS }
}

/// NCEP reanalysis surface variables plus outgoing longwave radiation.
pub const VARIABLES: &[VariableSpec] = &[
    VariableSpec { key: "air", description: "Air temperature", units: "degC", stem: "air.mon.mean", column: "air" },
    VariableSpec { key: "uwnd", description: "Zonal wind", units: "m/s", stem: "uwnd.mon.mean", column: "uwnd" },
    VariableSpec { key: "vwnd", description: "Meridional wind", units: "m/s", stem: "vwnd.mon.mean", column: "vwnd" },
    VariableSpec { key: "omega.sig995", description: "Vertical wind (omega)", units: "Pa/s", stem: "omega.sig995.mon.mean", column: "omega" },
    VariableSpec { key: "slp", description: "Sea level pressure", units: "hPa", stem: "slp.mon.mean", column: "slp" },
    VariableSpec { key: "rhum", description: "Relative humidity", units: "%", stem: "rhum.mon.mean", column: "rhum" },
    VariableSpec { key: "pr_wtr", description: "Precipitable water", units: "kg/m^2", stem: "pr_wtr.mon.mean", column: "pr_wtr" },
    VariableSpec { key: "pres", description: "Surface pressure", units: "Pa", stem: "pres.mon.mean", column: "pres" },
    VariableSpec { key: "pottmp.sig995", description: "Potential temperature", units: "K", stem: "pottmp.sig995.mon.mean", column: "pottmp" },
    VariableSpec { key: "olr", description: "Outgoing longwave radiation", units: "W/m^2", stem: "olr.mon.mean", column: "olr" },
];

/// Look up a registry entry by key.
pub fn variable(key: &str) -> Option<&'static VariableSpec> {
    VARIABLES.iter().find(|spec| spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_keys_are_unique() {
        let mut keys = VARIABLES.iter().map(|spec| spec.key).collect::<Vec<_>>();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), VARIABLES.len());
    }

    #[test]
    fn lookup_by_key() {
        let air = variable("air").unwrap();
        assert_eq!(air.stem, "air.mon.mean");
        assert_eq!(air.dimensions(), &["time", "lat", "lon"]);
        assert_eq!(air.column, "air");
        // Sigma-level products name their data variable without the level suffix.
        assert_eq!(variable("omega.sig995").unwrap().column, "omega");
        assert_eq!(variable("pottmp.sig995").unwrap().column, "pottmp");
        assert!(variable("snow").is_none());
    }
}
