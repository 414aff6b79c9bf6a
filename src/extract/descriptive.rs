//! Descriptive fields recovered without a language model: project name,
//! primary commodity, development stage and location.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Commodity, ProjectStage};
use crate::normalize::{normalize_commodity, normalize_stage};

/// Title phrases naming the project, most specific first.
static PROJECT_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let name = r"(?P<name>[A-Z][\w'’\-]*(?:\s+[A-Z][\w'’\-]*){0,5})\s+(?P<kind>Project|Property|Mine|Deposit|Operation)\b";
    vec![
        // "Technical Report Summary on the Thacker Pass Project"
        Regex::new(&format!(
            r"(?i:technical\s+report(?:\s+summary)?|feasibility\s+study|pre-?feasibility\s+study|preliminary\s+economic\s+assessment|mineral\s+resource\s+estimate)\s+(?i:on|for|of)\s+(?i:the\s+)?{}",
            name
        ))
        .expect("project title pattern should compile"),
        // "Thacker Pass Project Feasibility Study"
        Regex::new(&format!(
            r"{}\s+(?i:feasibility|pre-?feasibility|preliminary\s+economic|technical\s+report|scoping)",
            name
        ))
        .expect("project title pattern should compile"),
        Regex::new(name).expect("project title pattern should compile"),
    ]
});

/// Leading words that start a sentence rather than a name.
const NAME_STOP_WORDS: &[&str] = &["The", "This", "That", "Our", "Each", "Such", "A", "An", "Its"];

/// Find the project's name in title phrases, e.g. "Salar Verde Lithium Project".
pub fn detect_project_name(text: &str) -> Option<String> {
    for pattern in PROJECT_NAME_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let (Some(name), Some(kind)) = (caps.name("name"), caps.name("kind")) else {
                continue;
            };
            let mut words: Vec<&str> = name.as_str().split_whitespace().collect();
            while words.first().is_some_and(|w| NAME_STOP_WORDS.contains(w)) {
                words.remove(0);
            }
            if words.is_empty() {
                continue;
            }
            return Some(format!("{} {}", words.join(" "), kind.as_str()));
        }
    }
    None
}

/// Keyword regex per commodity; whole words only.
static COMMODITY_KEYWORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"lithium|spodumene|petalite|lepidolite", "lithium"),
        (r"copper|chalcopyrite", "copper"),
        (r"gold", "gold"),
        (r"silver", "silver"),
        (r"nickel", "nickel"),
        (r"cobalt", "cobalt"),
        (r"uranium|U3O8", "uranium"),
        (r"zinc|sphalerite", "zinc"),
        (r"galena|lead-zinc", "lead"),
        (r"iron\s+ore|magnetite|hematite", "iron ore"),
        (r"graphite", "graphite"),
        (r"rare\s+earths?", "rare earths"),
        (r"potash|sylvite", "potash"),
        (r"phosphate", "phosphate"),
        (r"coal", "coal"),
        (r"platinum|palladium|PGMs?|PGEs?", "pgm"),
        (r"vanadium", "vanadium"),
        (r"manganese", "manganese"),
        (r"molybdenum", "molybdenum"),
        (r"tungsten", "tungsten"),
        (r"antimony", "antimony"),
    ]
    .into_iter()
    .map(|(pattern, label)| {
        (
            Regex::new(&format!(r"(?i)\b(?:{})\b", pattern)).expect("commodity pattern should compile"),
            label,
        )
    })
    .collect()
});

/// Primary commodity by keyword frequency; ties go to the earlier entry.
pub fn detect_commodity(text: &str) -> Commodity {
    let mut best: Option<(&str, usize)> = None;
    for (regex, label) in COMMODITY_KEYWORDS.iter() {
        let count = regex.find_iter(text).count();
        if count > 0 && best.map_or(true, |(_, top)| count > top) {
            best = Some((*label, count));
        }
    }
    best.map(|(label, _)| normalize_commodity(label))
        .unwrap_or(Commodity::Other)
}

static STAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(pre[\s-]?feasibility|prefeasibility|definitive\s+feasibility|bankable\s+feasibility|feasibility|preliminary\s+economic\s+assessment|scoping\s+study|mineral\s+resource\s+estimate|care\s+and\s+maintenance|under\s+construction|commercial\s+production)\b|\b((?-i:PFS|DFS|BFS|PEA))\b",
    )
    .expect("stage pattern should compile")
});

/// Stage named by the first study type the text mentions; `None` when the
/// text names no study or production status.
pub fn detect_stage(text: &str) -> Option<ProjectStage> {
    let caps = STAGE_PATTERN.captures(text)?;
    let phrase = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    let stage = match phrase.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
        "definitive feasibility" | "bankable feasibility" => ProjectStage::Feasibility,
        "commercial production" => ProjectStage::Production,
        other => normalize_stage(other),
    };
    Some(stage)
}

/// (jurisdiction, country) pairs for the main mining regions.
const JURISDICTIONS: &[(&str, &str)] = &[
    ("Nevada", "United States"),
    ("Arizona", "United States"),
    ("Alaska", "United States"),
    ("Utah", "United States"),
    ("Idaho", "United States"),
    ("Montana", "United States"),
    ("Wyoming", "United States"),
    ("Colorado", "United States"),
    ("New Mexico", "United States"),
    ("California", "United States"),
    ("Minnesota", "United States"),
    ("South Dakota", "United States"),
    ("North Carolina", "United States"),
    ("Texas", "United States"),
    ("Michigan", "United States"),
    ("British Columbia", "Canada"),
    ("Ontario", "Canada"),
    ("Quebec", "Canada"),
    ("Québec", "Canada"),
    ("Manitoba", "Canada"),
    ("Saskatchewan", "Canada"),
    ("Yukon", "Canada"),
    ("Nunavut", "Canada"),
    ("Northwest Territories", "Canada"),
    ("Newfoundland and Labrador", "Canada"),
    ("New Brunswick", "Canada"),
    ("Nova Scotia", "Canada"),
    ("Alberta", "Canada"),
    ("Western Australia", "Australia"),
    ("Queensland", "Australia"),
    ("New South Wales", "Australia"),
    ("South Australia", "Australia"),
    ("Northern Territory", "Australia"),
    ("Tasmania", "Australia"),
];

/// Country names and the label they are stored under.
const COUNTRIES: &[(&str, &str)] = &[
    ("United States", "United States"),
    ("USA", "United States"),
    ("Canada", "Canada"),
    ("Australia", "Australia"),
    ("Chile", "Chile"),
    ("Argentina", "Argentina"),
    ("Peru", "Peru"),
    ("Mexico", "Mexico"),
    ("Brazil", "Brazil"),
    ("Bolivia", "Bolivia"),
    ("Ecuador", "Ecuador"),
    ("Colombia", "Colombia"),
    ("Democratic Republic of the Congo", "DRC"),
    ("DRC", "DRC"),
    ("Zambia", "Zambia"),
    ("South Africa", "South Africa"),
    ("Ghana", "Ghana"),
    ("Mali", "Mali"),
    ("Burkina Faso", "Burkina Faso"),
    ("Tanzania", "Tanzania"),
    ("Namibia", "Namibia"),
    ("Botswana", "Botswana"),
    ("Zimbabwe", "Zimbabwe"),
    ("Finland", "Finland"),
    ("Sweden", "Sweden"),
    ("Portugal", "Portugal"),
    ("Serbia", "Serbia"),
    ("Kazakhstan", "Kazakhstan"),
    ("Mongolia", "Mongolia"),
    ("Indonesia", "Indonesia"),
    ("Philippines", "Philippines"),
    ("Papua New Guinea", "Papua New Guinea"),
];

fn alternation(names: impl Iterator<Item = &'static str>) -> Regex {
    let mut names: Vec<&str> = names.collect();
    // Longest first so "South Australia" beats "Australia".
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let body = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{})(?:\b|$)", body)).expect("location pattern should compile")
}

static JURISDICTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| alternation(JURISDICTIONS.iter().map(|(name, _)| *name)));

static COUNTRY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| alternation(COUNTRIES.iter().map(|(name, _)| *name)));

fn most_frequent<'a>(regex: &Regex, text: &'a str) -> Option<&'a str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, found) in regex.find_iter(text).enumerate() {
        let entry = counts.entry(found.as_str()).or_insert((0, order));
        entry.0 += 1;
    }
    // Highest count, then earliest first mention.
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(name, _)| name)
}

/// Detected location as `(country, jurisdiction)`.
pub fn detect_location(text: &str) -> (Option<String>, Option<String>) {
    if let Some(found) = most_frequent(&JURISDICTION_PATTERN, text) {
        if let Some((name, country)) = JURISDICTIONS.iter().find(|(name, _)| *name == found) {
            let name = if *name == "Québec" { "Quebec" } else { *name };
            return (Some(country.to_string()), Some(name.to_string()));
        }
    }

    let country = most_frequent(&COUNTRY_PATTERN, text).and_then(|found| {
        COUNTRIES
            .iter()
            .find(|(name, _)| *name == found)
            .map(|(_, label)| label.to_string())
    });
    (country, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_from_report_title() {
        let text = "NI 43-101 Technical Report on the Thacker Pass Project, Humboldt County";
        assert_eq!(detect_project_name(text).as_deref(), Some("Thacker Pass Project"));

        let text = "S-K 1300 Technical Report Summary for the Salar Verde Lithium Project. Nevada.";
        assert_eq!(
            detect_project_name(text).as_deref(),
            Some("Salar Verde Lithium Project")
        );
    }

    #[test]
    fn test_project_name_strips_sentence_start() {
        let text = "The Rhyolite Ridge Project is located in Esmeralda County.";
        assert_eq!(detect_project_name(text).as_deref(), Some("Rhyolite Ridge Project"));
        assert_eq!(detect_project_name("no names here"), None);
    }

    #[test]
    fn test_commodity_by_frequency() {
        let text = "Lithium brine. Lithium carbonate plant. Minor gold credits. Spodumene concentrate.";
        assert_eq!(detect_commodity(text), Commodity::Lithium);
        assert_eq!(detect_commodity("iron ore and magnetite"), Commodity::IronOre);
        assert_eq!(detect_commodity("nothing relevant"), Commodity::Other);
    }

    #[test]
    fn test_stage_from_study_type() {
        assert_eq!(
            detect_stage("This Pre-Feasibility Study supersedes the 2019 PEA."),
            Some(ProjectStage::PreFeasibility)
        );
        assert_eq!(
            detect_stage("Definitive Feasibility Study for the project"),
            Some(ProjectStage::Feasibility)
        );
        assert_eq!(detect_stage("Results of the PEA"), Some(ProjectStage::Pea));
    }

    #[test]
    fn test_no_study_means_no_stage() {
        assert_eq!(detect_stage("early drilling"), None);
        assert_eq!(
            detect_stage("Quarterly update on lithium brine operations in Nevada."),
            None
        );
    }

    #[test]
    fn test_location_prefers_subnational_region() {
        let (country, jurisdiction) =
            detect_location("Located in Nevada, USA. The Nevada claims cover 10,000 acres.");
        assert_eq!(country.as_deref(), Some("United States"));
        assert_eq!(jurisdiction.as_deref(), Some("Nevada"));

        let (country, jurisdiction) = detect_location("The salar lies in northern Chile.");
        assert_eq!(country.as_deref(), Some("Chile"));
        assert_eq!(jurisdiction, None);

        let (country, _) = detect_location("The project in South Australia.");
        assert_eq!(country.as_deref(), Some("Australia"));
    }
}
