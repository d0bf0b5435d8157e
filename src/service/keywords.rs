//! Lookup tables for classification, cost separation and pattern detection.
//!
//! Keywords are stored in normalized form (lowercase, no punctuation, no stop
//! words) so they can be matched against `LineItem::normalized_description`.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::{ChargeType, VehicleSystem};

/// Estimating operation, after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Replace,
    RemoveAndInstall,
    Refinish,
    Blend,
    Repair,
    Sublet,
    Miscellaneous,
}

impl Operation {
    pub fn charge_type(self) -> ChargeType {
        match self {
            Operation::Replace => ChargeType::PartWithLabor,
            Operation::RemoveAndInstall
            | Operation::Refinish
            | Operation::Blend
            | Operation::Repair => ChargeType::LaborOnly,
            Operation::Sublet => ChargeType::Sublet,
            Operation::Miscellaneous => ChargeType::Miscellaneous,
        }
    }

    /// Typical share of the total that is the part, in hundredths.
    pub fn typical_part_share(self) -> Option<u32> {
        match self {
            Operation::Replace => Some(70),
            Operation::Repair => Some(35),
            Operation::Refinish | Operation::Blend => Some(25),
            Operation::RemoveAndInstall => Some(10),
            Operation::Sublet | Operation::Miscellaneous => None,
        }
    }
}

const OPERATION_ALIASES: &[(&str, Operation)] = &[
    ("replace", Operation::Replace),
    ("repl", Operation::Replace),
    ("rpl", Operation::Replace),
    ("new", Operation::Replace),
    ("remove-and-install", Operation::RemoveAndInstall),
    ("remove and install", Operation::RemoveAndInstall),
    ("r&i", Operation::RemoveAndInstall),
    ("ri", Operation::RemoveAndInstall),
    ("refinish", Operation::Refinish),
    ("rfn", Operation::Refinish),
    ("refn", Operation::Refinish),
    ("blend", Operation::Blend),
    ("bld", Operation::Blend),
    ("repair", Operation::Repair),
    ("rpr", Operation::Repair),
    ("sublet", Operation::Sublet),
    ("subl", Operation::Sublet),
    ("sub", Operation::Sublet),
    ("misc", Operation::Miscellaneous),
    ("fee", Operation::Miscellaneous),
];

static OPERATIONS: LazyLock<HashMap<&'static str, Operation>> =
    LazyLock::new(|| OPERATION_ALIASES.iter().copied().collect());

pub fn lookup_operation(code: &str) -> Option<Operation> {
    OPERATIONS.get(code.trim().to_lowercase().as_str()).copied()
}

const CATEGORY_HINTS: &[(&str, ChargeType)] = &[
    ("oem", ChargeType::PartWithLabor),
    ("aftermarket", ChargeType::PartWithLabor),
    ("a/m", ChargeType::PartWithLabor),
    ("used", ChargeType::PartWithLabor),
    ("recycled", ChargeType::PartWithLabor),
    ("lkq", ChargeType::PartWithLabor),
    ("reconditioned", ChargeType::PartWithLabor),
    ("remanufactured", ChargeType::PartWithLabor),
    ("part", ChargeType::PartWithLabor),
    ("parts", ChargeType::PartWithLabor),
    ("labor", ChargeType::LaborOnly),
    ("body labor", ChargeType::LaborOnly),
    ("paint labor", ChargeType::LaborOnly),
    ("mechanical labor", ChargeType::LaborOnly),
    ("frame labor", ChargeType::LaborOnly),
    ("refinish", ChargeType::LaborOnly),
    ("paint material", ChargeType::Material),
    ("paint materials", ChargeType::Material),
    ("material", ChargeType::Material),
    ("materials", ChargeType::Material),
    ("consumable", ChargeType::Material),
    ("consumables", ChargeType::Material),
    ("supplies", ChargeType::Material),
    ("sublet", ChargeType::Sublet),
    ("misc", ChargeType::Miscellaneous),
    ("miscellaneous", ChargeType::Miscellaneous),
    ("fee", ChargeType::Miscellaneous),
    ("other", ChargeType::Miscellaneous),
];

static CATEGORIES: LazyLock<HashMap<&'static str, ChargeType>> =
    LazyLock::new(|| CATEGORY_HINTS.iter().copied().collect());

pub fn lookup_category(hint: &str) -> Option<ChargeType> {
    CATEGORIES.get(hint.trim().to_lowercase().as_str()).copied()
}

pub const OEM_HINTS: &[&str] = &["oem", "oe", "genuine"];
pub const AFTERMARKET_HINTS: &[&str] = &["aftermarket", "a/m", "am", "capa", "non oem", "non-oem"];

/// A curated keyword set and the charge type it implies.
pub struct KeywordSet {
    pub name: &'static str,
    pub charge_type: ChargeType,
    pub words: &'static [&'static str],
}

impl KeywordSet {
    /// Number of keywords found as whole words in `description`.
    pub fn hits(&self, description: &str) -> usize {
        let padded = format!(" {description} ");
        self.words
            .iter()
            .filter(|word| padded.contains(&format!(" {word} ")))
            .count()
    }
}

const SUBLET_NOUNS: &[&str] = &[
    "sublet",
    "alignment",
    "wheel alignment",
    "towing",
    "tow",
    "glass install",
    "windshield install",
    "calibration",
    "adas calibration",
    "scan",
    "pre scan",
    "post scan",
    "diagnostic scan",
    "detail",
    "ac recharge",
    "freon",
    "pdr",
    "paintless dent",
    "upholstery",
    "vendor",
    "outsourced",
];

const MATERIAL_NOUNS: &[&str] = &[
    "paint materials",
    "paint material",
    "body materials",
    "shop materials",
    "shop supplies",
    "materials",
    "consumables",
    "seam sealer",
    "sealer",
    "adhesive",
    "primer",
    "clearcoat",
    "clear coat",
    "basecoat",
    "body filler",
    "filler",
    "sandpaper",
    "masking",
    "cavity wax",
    "corrosion protection",
    "undercoating",
    "hazardous waste",
    "rags",
    "tape",
];

const REPLACEMENT_VERBS: &[&str] = &[
    "replace",
    "replaced",
    "replacement",
    "repl",
    "rpl",
    "new",
    "install new",
    "supply",
];

const LABOR_VERBS: &[&str] = &[
    "repair",
    "rpr",
    "refinish",
    "rfn",
    "blend",
    "remove install",
    "r i",
    "overhaul",
    "align",
    "adjust",
    "pull",
    "straighten",
    "set up",
    "measure",
    "diagnose",
    "labor",
    "aim",
    "clean",
    "polish",
    "buff",
    "tint",
    "test",
    "inspect",
    "mask",
    "color sand",
];

const PART_NOUNS: &[&str] = &[
    "bumper",
    "bumper cover",
    "fender",
    "hood",
    "door",
    "door shell",
    "quarter panel",
    "panel",
    "grille",
    "headlamp",
    "headlight",
    "tail lamp",
    "taillight",
    "mirror",
    "windshield",
    "radiator",
    "condenser",
    "reinforcement",
    "absorber",
    "bracket",
    "moulding",
    "molding",
    "emblem",
    "nameplate",
    "liner",
    "splash shield",
    "wheel",
    "tire",
    "sensor",
    "airbag",
    "seat belt",
    "trunk lid",
    "liftgate",
    "tailgate",
    "roof",
    "rocker",
    "pillar",
    "apron",
    "rail",
    "support",
    "hinge",
    "latch",
    "handle",
    "clip",
    "fastener",
    "bolt",
    "nut",
    "valance",
    "spoiler",
    "module",
    "control arm",
    "strut",
    "shock",
    "axle",
    "hub",
    "bearing",
    "compressor",
    "fan",
    "shroud",
];

/// Checked in this order; the first set with a hit wins. Sublet and material
/// nouns come before the part nouns they are usually written next to
/// ("wheel alignment", "bumper primer"), and labor verbs before part nouns
/// ("refinish bumper").
pub static KEYWORD_SETS: &[KeywordSet] = &[
    KeywordSet {
        name: "sublet",
        charge_type: ChargeType::Sublet,
        words: SUBLET_NOUNS,
    },
    KeywordSet {
        name: "material",
        charge_type: ChargeType::Material,
        words: MATERIAL_NOUNS,
    },
    KeywordSet {
        name: "replacement",
        charge_type: ChargeType::PartWithLabor,
        words: REPLACEMENT_VERBS,
    },
    KeywordSet {
        name: "labor",
        charge_type: ChargeType::LaborOnly,
        words: LABOR_VERBS,
    },
    KeywordSet {
        name: "part",
        charge_type: ChargeType::PartWithLabor,
        words: PART_NOUNS,
    },
];

const SYSTEM_KEYWORDS: &[(VehicleSystem, &[&str])] = &[
    (
        VehicleSystem::Frame,
        &["frame", "unibody", "rail", "apron", "pillar", "structural", "measure", "pull"],
    ),
    (
        VehicleSystem::Refinish,
        &["refinish", "paint", "blend", "clearcoat", "clear coat", "basecoat", "primer"],
    ),
    (
        VehicleSystem::Glass,
        &["glass", "windshield", "back glass", "quarter glass", "door glass"],
    ),
    (
        VehicleSystem::Electrical,
        &["wiring", "harness", "sensor", "module", "airbag", "battery", "camera", "radar", "electrical"],
    ),
    (
        VehicleSystem::Mechanical,
        &[
            "radiator", "condenser", "compressor", "suspension", "control arm", "strut", "shock",
            "axle", "hub", "bearing", "engine", "transmission", "brake", "alignment", "coolant",
            "mechanical",
        ],
    ),
    (
        VehicleSystem::Body,
        &[
            "bumper", "fender", "hood", "door", "quarter panel", "panel", "grille", "mirror",
            "trunk lid", "liftgate", "roof", "rocker", "moulding", "molding", "body",
        ],
    ),
];

const SYSTEM_CATEGORY_HINTS: &[(&str, VehicleSystem)] = &[
    ("body", VehicleSystem::Body),
    ("body labor", VehicleSystem::Body),
    ("paint", VehicleSystem::Refinish),
    ("paint labor", VehicleSystem::Refinish),
    ("paint material", VehicleSystem::Refinish),
    ("paint materials", VehicleSystem::Refinish),
    ("refinish", VehicleSystem::Refinish),
    ("mechanical", VehicleSystem::Mechanical),
    ("mechanical labor", VehicleSystem::Mechanical),
    ("frame", VehicleSystem::Frame),
    ("frame labor", VehicleSystem::Frame),
    ("structural", VehicleSystem::Frame),
    ("electrical", VehicleSystem::Electrical),
    ("glass", VehicleSystem::Glass),
];

/// Vehicle system from the category hint, then from description keywords.
pub fn infer_vehicle_system(category: Option<&str>, normalized_description: &str) -> VehicleSystem {
    if let Some(hint) = category {
        let hint = hint.trim().to_lowercase();
        if let Some((_, system)) = SYSTEM_CATEGORY_HINTS.iter().find(|(h, _)| *h == hint) {
            return *system;
        }
    }

    let padded = format!(" {normalized_description} ");
    SYSTEM_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| padded.contains(&format!(" {w} "))))
        .map(|(system, _)| *system)
        .unwrap_or(VehicleSystem::General)
}

/// Default hourly labor rate in dollars.
pub fn default_labor_rate(system: VehicleSystem) -> u32 {
    match system {
        VehicleSystem::Body | VehicleSystem::Refinish => 58,
        VehicleSystem::Mechanical | VehicleSystem::Electrical => 110,
        VehicleSystem::Frame => 75,
        VehicleSystem::Glass => 60,
        VehicleSystem::General => 65,
    }
}

/// Labor hours above this on a single line are unusual.
pub fn labor_hour_cap(system: VehicleSystem) -> u32 {
    match system {
        VehicleSystem::Body => 40,
        VehicleSystem::Refinish => 30,
        VehicleSystem::Mechanical => 25,
        VehicleSystem::Frame => 50,
        VehicleSystem::Electrical => 15,
        VehicleSystem::Glass => 6,
        VehicleSystem::General => 20,
    }
}

/// Components that collision damage rarely reaches.
pub const RARELY_DAMAGED_COMPONENTS: &[&str] = &[
    "engine block",
    "cylinder head",
    "crankshaft",
    "camshaft",
    "piston",
    "timing chain",
    "timing belt",
    "transmission",
    "torque converter",
    "differential",
    "fuel tank",
    "fuel pump",
    "catalytic converter",
    "steering column",
    "ecu",
    "engine computer",
    "oil pump",
    "water pump",
    "head gasket",
];

pub fn rarely_damaged_component(normalized_description: &str) -> Option<&'static str> {
    let padded = format!(" {normalized_description} ");
    RARELY_DAMAGED_COMPONENTS
        .iter()
        .find(|c| padded.contains(&format!(" {c} ")))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_aliases_resolve() {
        assert_eq!(lookup_operation("Replace"), Some(Operation::Replace));
        assert_eq!(lookup_operation(" R&I "), Some(Operation::RemoveAndInstall));
        assert_eq!(lookup_operation("subl"), Some(Operation::Sublet));
        assert_eq!(lookup_operation("weld"), None);
    }

    #[test]
    fn keyword_hits_are_whole_words() {
        let part = &KEYWORD_SETS[4];
        assert_eq!(part.name, "part");
        assert_eq!(part.hits("front bumper cover"), 2);
        assert_eq!(part.hits("doorway"), 0);
    }

    #[test]
    fn vehicle_system_prefers_category_hint() {
        assert_eq!(infer_vehicle_system(Some("Frame"), "front bumper"), VehicleSystem::Frame);
        assert_eq!(infer_vehicle_system(None, "front bumper cover"), VehicleSystem::Body);
        assert_eq!(infer_vehicle_system(None, "radiator support"), VehicleSystem::Mechanical);
        assert_eq!(infer_vehicle_system(None, "towing"), VehicleSystem::General);
    }

    #[test]
    fn rarely_damaged_lookup() {
        assert_eq!(rarely_damaged_component("automatic transmission assembly"), Some("transmission"));
        assert_eq!(rarely_damaged_component("front bumper"), None);
    }
}
