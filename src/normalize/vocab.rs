//! Commodity and stage vocabularies.
//!
//! Registry text is uncontrolled, so unknown input degrades to `Other` /
//! `Exploration` rather than being rejected.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::{Commodity, ProjectStage};

static COMMODITY_TABLE: LazyLock<HashMap<&'static str, Commodity>> = LazyLock::new(|| {
    use Commodity::*;
    [
        ("lithium", Lithium),
        ("li", Lithium),
        ("li2o", Lithium),
        ("lce", Lithium),
        ("lithium carbonate", Lithium),
        ("lithium carbonate equivalent", Lithium),
        ("lithium hydroxide", Lithium),
        ("spodumene", Lithium),
        ("lithium brine", Lithium),
        ("copper", Copper),
        ("cu", Copper),
        ("copper-gold", Copper),
        ("copper gold", Copper),
        ("porphyry copper", Copper),
        ("gold", Gold),
        ("au", Gold),
        ("gold-silver", Gold),
        ("gold silver", Gold),
        ("silver", Silver),
        ("ag", Silver),
        ("nickel", Nickel),
        ("ni", Nickel),
        ("nickel sulphide", Nickel),
        ("nickel sulfide", Nickel),
        ("nickel laterite", Nickel),
        ("cobalt", Cobalt),
        ("co", Cobalt),
        ("uranium", Uranium),
        ("u", Uranium),
        ("u3o8", Uranium),
        ("zinc", Zinc),
        ("zn", Zinc),
        ("zinc-lead", Zinc),
        ("lead", Lead),
        ("pb", Lead),
        ("lead-zinc", Lead),
        ("iron ore", IronOre),
        ("iron", IronOre),
        ("fe", IronOre),
        ("magnetite", IronOre),
        ("hematite", IronOre),
        ("graphite", Graphite),
        ("natural graphite", Graphite),
        ("flake graphite", Graphite),
        ("rare earths", RareEarths),
        ("rare earth", RareEarths),
        ("rare earth elements", RareEarths),
        ("ree", RareEarths),
        ("treo", RareEarths),
        ("potash", Potash),
        ("sop", Potash),
        ("mop", Potash),
        ("sulphate of potash", Potash),
        ("muriate of potash", Potash),
        ("phosphate", Phosphate),
        ("phosphate rock", Phosphate),
        ("p2o5", Phosphate),
        ("coal", Coal),
        ("metallurgical coal", Coal),
        ("thermal coal", Coal),
        ("coking coal", Coal),
        ("pgm", Pgm),
        ("pge", Pgm),
        ("pgms", Pgm),
        ("platinum", Pgm),
        ("palladium", Pgm),
        ("platinum group metals", Pgm),
        ("vanadium", Vanadium),
        ("v2o5", Vanadium),
        ("manganese", Manganese),
        ("mn", Manganese),
        ("molybdenum", Molybdenum),
        ("mo", Molybdenum),
        ("moly", Molybdenum),
        ("tin", Tin),
        ("sn", Tin),
        ("tungsten", Tungsten),
        ("w", Tungsten),
        ("wo3", Tungsten),
        ("antimony", Antimony),
        ("sb", Antimony),
        ("other", Other),
    ]
    .into_iter()
    .collect()
});

static STAGE_TABLE: LazyLock<HashMap<&'static str, ProjectStage>> = LazyLock::new(|| {
    use ProjectStage::*;
    [
        ("exploration", Exploration),
        ("early exploration", Exploration),
        ("early stage", Exploration),
        ("grassroots", Exploration),
        ("advanced exploration", Exploration),
        ("resource definition", ResourceDefinition),
        ("resource estimate", ResourceDefinition),
        ("mineral resource estimate", ResourceDefinition),
        ("mre", ResourceDefinition),
        ("resource", ResourceDefinition),
        ("pea", Pea),
        ("preliminary economic assessment", Pea),
        ("scoping", Pea),
        ("scoping study", Pea),
        ("pfs", PreFeasibility),
        ("pre-feasibility", PreFeasibility),
        ("prefeasibility", PreFeasibility),
        ("pre feasibility", PreFeasibility),
        ("pre-feasibility study", PreFeasibility),
        ("prefeasibility study", PreFeasibility),
        ("fs", Feasibility),
        ("dfs", Feasibility),
        ("bfs", Feasibility),
        ("feasibility", Feasibility),
        ("feasibility study", Feasibility),
        ("definitive feasibility study", Feasibility),
        ("bankable feasibility study", Feasibility),
        ("permitting", Permitting),
        ("permitted", Permitting),
        ("development", Construction),
        ("construction", Construction),
        ("under construction", Construction),
        ("production", Production),
        ("producing", Production),
        ("operating", Production),
        ("operation", Production),
        ("care and maintenance", CareAndMaintenance),
        ("care & maintenance", CareAndMaintenance),
        ("suspended", CareAndMaintenance),
        ("closed", Closed),
        ("closure", Closed),
        ("reclamation", Closed),
    ]
    .into_iter()
    .collect()
});

/// Lowercase, trim, collapse whitespace and drop surrounding punctuation.
fn lookup_key(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '&')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Map free-text commodity to the closed vocabulary; unknown input is `Other`.
pub fn normalize_commodity(raw: &str) -> Commodity {
    let key = lookup_key(raw);
    if let Some(commodity) = COMMODITY_TABLE.get(key.as_str()) {
        return *commodity;
    }
    // Canonical labels ("Iron Ore", "Rare Earths") are accepted case-insensitively.
    Commodity::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(&key))
        .unwrap_or(Commodity::Other)
}

/// Map free-text stage to the closed vocabulary; unknown input is `Exploration`.
pub fn normalize_stage(raw: &str) -> ProjectStage {
    let key = lookup_key(raw);
    if let Some(stage) = STAGE_TABLE.get(key.as_str()) {
        return *stage;
    }
    ProjectStage::ALL
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(&key))
        .unwrap_or(ProjectStage::Exploration)
}
