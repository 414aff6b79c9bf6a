//! Regular-expression rules for the checklist metrics.
//!
//! Each metric owns an ordered list of rules. Rules are tried in order and
//! the first match that survives unit conversion and the range check wins.
//! Tax-qualified NPV/IRR rules are listed before the unqualified ones.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::{ExtractedMetrics, GradeUnit, MetricField};
use crate::normalize::{parse_number, MassUnit, MoneyScale};

// ============================================================================
// Shared fragments
// ============================================================================

/// Number as printed in reports: `2,300`, `25.1`, `0.23`.
const NUM: &str = r"(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";

/// Currency marker in front of an amount.
const CUR: &str = r"(?:US\s?\$|USD\s?\$?|C\$|CAD\s?\$?|A\$|AUD\s?\$?|\$)\s?";

const SCALE: &str = r"\s*(?P<scale>billion|million|thousand|bn|mm|m|b|k)?\b";

const MASS_UNIT: &str = r"\s*(?P<unit>(?:thousand|million)\s+(?:tonnes|tons|ounces|oz|pounds|lbs)|tonnes|tonne|tons|ton|Mtpa|ktpa|tpa|Mt|kt|t|Moz|koz|ounces|oz|Mlbs|Mlb|klbs|klb|pounds|lbs|lb)\b";

const GRADE_UNIT: &str = r"\s*(?P<gunit>%|g/tonne|g/t|gpt|oz/ton|oz/t|opt|ppm)";

const PER_TONNE: &str = r"\s*(?:/|per)\s*(?:tonne|ton|t)\b";

const YEARS: &str = r"\s*(?:-\s*)?(?:years?|yrs?)\b";

const POST: &str = r"(?:post|after)[\s-]?tax";
const PRE: &str = r"(?:pre|before)[\s-]?tax";
const NPV: &str = r"\b(?:(?-i:NPV)|net\s+present\s+value)";
const IRR: &str = r"\b(?:(?-i:IRR)|internal\s+rate\s+of\s+return)\b";

/// Expand `{TOKEN}` placeholders and compile case-insensitively.
fn rx(template: &str) -> Regex {
    let money = format!("{}{}{}", CUR, NUM, SCALE);
    let pattern = template
        .replace("{MONEY_PER_T}", &format!("{}{}{}", CUR, NUM, PER_TONNE))
        .replace("{MONEY}", &money)
        .replace("{PCT}", &format!(r"{}\s?%", NUM))
        .replace("{MASS}", &format!("{}{}", NUM, MASS_UNIT))
        .replace("{GRADE}", &format!("{}{}", NUM, GRADE_UNIT))
        .replace("{YEARS}", &format!("{}{}", NUM, YEARS))
        .replace("{POST}", POST)
        .replace("{PRE}", PRE)
        .replace("{NPV}", NPV)
        .replace("{IRR}", IRR);
    Regex::new(&format!("(?i){}", pattern)).expect("metric pattern should compile")
}

// ============================================================================
// Rules
// ============================================================================

/// How the captured number becomes a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    /// Currency amount normalised to millions.
    MoneyMillions,
    /// Currency amount per tonne, stored as-is.
    MoneyPerTonne,
    Percent,
    Years,
    /// Mass normalised to tonnes.
    Tonnes,
    /// Grade with its unit.
    Grade,
}

struct Rule {
    regex: Regex,
    /// A match whose text also matches this is discarded.
    reject: Option<Regex>,
}

impl Rule {
    fn new(template: &str) -> Self {
        Self {
            regex: rx(template),
            reject: None,
        }
    }

    fn rejecting(template: &str, reject: &str) -> Self {
        Self {
            regex: rx(template),
            reject: Some(rx(reject)),
        }
    }
}

struct MetricRules {
    field: MetricField,
    kind: ValueKind,
    rules: Vec<Rule>,
}

static RULES: LazyLock<Vec<MetricRules>> = LazyLock::new(|| {
    use MetricField::*;
    use ValueKind::*;

    vec![
        MetricRules {
            field: CapexUsdM,
            kind: MoneyMillions,
            rules: vec![
                Rule::new(
                    r"\b(?:initial|pre-?production|upfront|start-?up|development)\s+(?:capital(?:\s+(?:costs?|expenditures?|requirements?|investment|estimate))?|capex)\b[^$]{0,60}?{MONEY}",
                ),
                Rule::rejecting(
                    r"(?:(?:sustaining|closure|operating)\s+)?\b(?:capex|capital\s+(?:costs?|expenditures?|investment))\b[^$]{0,60}?{MONEY}",
                    r"sustaining|closure|operating",
                ),
            ],
        },
        MetricRules {
            field: SustainingCapexUsdM,
            kind: MoneyMillions,
            rules: vec![Rule::new(
                r"\bsustaining\s+(?:capital|capex)(?:\s+(?:costs?|expenditures?))?\b[^$]{0,60}?{MONEY}",
            )],
        },
        MetricRules {
            field: PostTaxNpvUsdM,
            kind: MoneyMillions,
            rules: vec![
                Rule::new(r"\b{POST}\s+{NPV}[^$]{0,60}?{MONEY}"),
                Rule::new(r"{NPV}[^$]{0,40}?\(?{POST}\)?[^$]{0,40}?{MONEY}"),
                Rule::rejecting(r"(?:\b{PRE}\s+)?{NPV}[^$]{0,60}?{MONEY}", r"{PRE}"),
            ],
        },
        MetricRules {
            field: PreTaxNpvUsdM,
            kind: MoneyMillions,
            rules: vec![
                Rule::new(r"\b{PRE}\s+{NPV}[^$]{0,60}?{MONEY}"),
                Rule::new(r"{NPV}[^$]{0,40}?\(?{PRE}\)?[^$]{0,40}?{MONEY}"),
            ],
        },
        MetricRules {
            field: IrrPercent,
            kind: Percent,
            rules: vec![
                Rule::new(r"\b{POST}\s+{IRR}[^\d%$]{0,40}?{PCT}"),
                Rule::new(r"{IRR}[^\d%$]{0,40}?\(?{POST}\)?[^\d%$]{0,40}?{PCT}"),
                Rule::new(r"{IRR}[^\d%$]{0,40}?{PCT}\s*\(?{POST}"),
                Rule::rejecting(
                    r"(?:\b{PRE}\s+)?{IRR}[^\d%$]{0,40}?{PCT}(?:\s*\(?{PRE})?",
                    r"{PRE}",
                ),
            ],
        },
        MetricRules {
            field: PreTaxIrrPercent,
            kind: Percent,
            rules: vec![
                Rule::new(r"\b{PRE}\s+{IRR}[^\d%$]{0,40}?{PCT}"),
                Rule::new(r"{IRR}[^\d%$]{0,40}?\(?{PRE}\)?[^\d%$]{0,40}?{PCT}"),
                Rule::new(r"{IRR}[^\d%$]{0,40}?{PCT}\s*\(?{PRE}"),
            ],
        },
        MetricRules {
            field: PaybackYears,
            kind: Years,
            rules: vec![Rule::new(r"\bpayback(?:\s+period)?\b[^\d]{0,40}?{YEARS}")],
        },
        MetricRules {
            field: MineLifeYears,
            kind: Years,
            rules: vec![
                Rule::new(r"\b(?:mine|project|operating|production|LOM)\s+life\b[^\d]{0,40}?{YEARS}"),
                Rule::new(r"\blife[\s-]of[\s-]mine\b(?:\s*\(LOM\))?[^\d]{0,40}?{YEARS}"),
                Rule::new(r"{YEARS}[\s-]+(?:mine|project|operating)\s+life\b"),
            ],
        },
        MetricRules {
            field: AnnualProductionTonnes,
            kind: Tonnes,
            rules: vec![
                Rule::new(r"\b(?:average\s+)?(?:annual|yearly)\s+(?:production|output)\b[^\d]{0,60}?{MASS}"),
                Rule::new(
                    r"\b(?:produce|producing|production\s+of|output\s+of)\b[^\d]{0,40}?{MASS}\s*(?:per\s+(?:year|annum)|annually|/\s*(?:yr|year|a)\b)",
                ),
                Rule::new(r"{MASS}\s*(?:per\s+(?:year|annum)|annually)"),
            ],
        },
        MetricRules {
            field: TotalResourceTonnes,
            kind: Tonnes,
            rules: vec![
                Rule::new(
                    r"\b(?:measured\s+(?:and|&)\s+indicated|M\s?&\s?I)(?:\s+(?:mineral\s+)?resources?)?\b[^\d]{0,60}?{MASS}",
                ),
                Rule::new(r"\b(?:total\s+)?(?:mineral\s+)?resources?\b[^\d]{0,40}?{MASS}"),
            ],
        },
        MetricRules {
            field: TotalReserveTonnes,
            kind: Tonnes,
            rules: vec![Rule::new(
                r"\b(?:proven\s+(?:and|&)\s+probable|P\s?&\s?P|(?:total\s+)?(?:mineral|ore)\s+reserves?|total\s+reserves?)\b[^\d]{0,60}?{MASS}",
            )],
        },
        MetricRules {
            field: ResourceGrade,
            kind: Grade,
            rules: vec![
                Rule::new(r"\b(?:average\s+)?grade\b[^\d]{0,40}?{GRADE}"),
                Rule::new(r"@\s*{GRADE}"),
                Rule::new(
                    r"{GRADE}\s*(?-i:Li2O|Li|Cu|Au|Ag|Ni|Co|U3O8|Zn|Pb|Fe|TREO|V2O5|Mn|Mo|Sn|WO3|Sb|P2O5|K2O|LCE)\b",
                ),
            ],
        },
        MetricRules {
            field: OpexUsdPerTonne,
            kind: MoneyPerTonne,
            rules: vec![Rule::rejecting(
                r"(?:all[\s-]in\s+sustaining\s+)?\b(?:operating\s+costs?|opex|cash\s+costs?)\b[^$]{0,60}?{MONEY_PER_T}",
                r"all[\s-]in",
            )],
        },
        MetricRules {
            field: AiscUsdPerTonne,
            kind: MoneyPerTonne,
            rules: vec![Rule::new(
                r"\b(?:(?-i:AISC)|all[\s-]in\s+sustaining\s+costs?)\b[^$]{0,60}?{MONEY_PER_T}",
            )],
        },
    ]
});

// ============================================================================
// Conversion
// ============================================================================

/// Currency amount in millions. Without a scale word, amounts of 100,000 and
/// above are read as plain dollars; smaller ones are assumed to already be in
/// millions, which is how report tables print them.
fn money_millions(caps: &Captures) -> Option<f64> {
    let value = parse_number(caps.name("num")?.as_str())?;
    match caps.name("scale") {
        Some(scale) => Some(MoneyScale::from_token(scale.as_str())?.to_millions(value)),
        None if value >= 100_000.0 => Some(MoneyScale::Units.to_millions(value)),
        None => Some(value),
    }
}

fn tonnes(caps: &Captures) -> Option<f64> {
    let value = parse_number(caps.name("num")?.as_str())?;
    let unit = MassUnit::from_token(caps.name("unit")?.as_str())?;
    Some(unit.to_tonnes(value))
}

/// Apply one match to `metrics`. Returns true when the value was admitted.
fn apply(metrics: &mut ExtractedMetrics, field: MetricField, kind: ValueKind, caps: &Captures) -> bool {
    let plain = || parse_number(caps.name("num")?.as_str());
    match kind {
        ValueKind::Grade => {
            let Some(value) = plain() else { return false };
            let Some(unit) = caps.name("gunit").and_then(|u| GradeUnit::from_str(u.as_str())) else {
                return false;
            };
            metrics.set_grade(value, unit)
        }
        ValueKind::MoneyMillions => money_millions(caps).is_some_and(|v| metrics.set(field, v)),
        ValueKind::Tonnes => tonnes(caps).is_some_and(|v| metrics.set(field, v)),
        ValueKind::MoneyPerTonne | ValueKind::Percent | ValueKind::Years => {
            plain().is_some_and(|v| metrics.set(field, v))
        }
    }
}

/// Run every metric's rule list over `text`.
pub fn extract_metrics(text: &str) -> ExtractedMetrics {
    let mut metrics = ExtractedMetrics::default();

    for metric in RULES.iter() {
        'rules: for rule in &metric.rules {
            for caps in rule.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                if rule
                    .reject
                    .as_ref()
                    .is_some_and(|reject| reject.is_match(whole.as_str()))
                {
                    continue;
                }
                if apply(&mut metrics, metric.field, metric.kind, &caps) {
                    tracing::trace!(
                        field = metric.field.as_str(),
                        matched = whole.as_str(),
                        "Metric matched"
                    );
                    break 'rules;
                }
            }
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(RULES.len(), 14);
    }

    #[test]
    fn test_fixture_sentences() {
        let text = "The study estimates a post-tax NPV of $2,300 million at an 8% discount rate \
                    and an IRR 25.1% post-tax. The initial CAPEX of $1,070 million covers the plant. \
                    The mine life 40 years supports annual production of 80,000 tonnes lithium \
                    carbonate. The resource has an average grade 0.23% Li.";
        let metrics = extract_metrics(text);

        assert_eq!(metrics.post_tax_npv_usd_m, Some(2300.0));
        assert_eq!(metrics.irr_percent, Some(25.1));
        assert_eq!(metrics.capex_usd_m, Some(1070.0));
        assert_eq!(metrics.mine_life_years, Some(40.0));
        assert_eq!(metrics.annual_production_tonnes, Some(80_000.0));
        assert_eq!(metrics.resource_grade, Some(0.23));
        assert_eq!(metrics.resource_grade_unit, Some(GradeUnit::Percent));
        assert_eq!(metrics.pre_tax_npv_usd_m, None);
        assert_eq!(metrics.pre_tax_irr_percent, None);
        assert_eq!(metrics.found_count(), 6);
    }

    #[test]
    fn test_post_tax_preferred_over_pre_tax() {
        let text = "The pre-tax NPV of $3,100 million and a post-tax NPV of US$2.3 billion. \
                    Pre-tax IRR of 31.0% and after-tax IRR of 24.5%.";
        let metrics = extract_metrics(text);
        assert_eq!(metrics.post_tax_npv_usd_m, Some(2300.0));
        assert_eq!(metrics.pre_tax_npv_usd_m, Some(3100.0));
        assert_eq!(metrics.irr_percent, Some(24.5));
        assert_eq!(metrics.pre_tax_irr_percent, Some(31.0));
    }

    #[test]
    fn test_unqualified_npv_skips_pre_tax_only_mentions() {
        let metrics = extract_metrics("A pre-tax NPV of $900 million was estimated.");
        assert_eq!(metrics.post_tax_npv_usd_m, None);
        assert_eq!(metrics.pre_tax_npv_usd_m, Some(900.0));

        let metrics = extract_metrics("The project NPV of $450 million supports development.");
        assert_eq!(metrics.post_tax_npv_usd_m, Some(450.0));
    }

    #[test]
    fn test_out_of_range_irr_is_discarded() {
        let metrics = extract_metrics("The project delivers an IRR of 150% post-tax.");
        assert_eq!(metrics.irr_percent, None);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_mass_units_converted_at_match_time() {
        let metrics = extract_metrics(
            "Average annual production of 38.5 million pounds of copper. \
             Measured and Indicated resources of 1.2 Mt at 1.5 g/t Au.",
        );
        let expected = 38.5e6 * 0.45359237 / 1000.0;
        let production = metrics.annual_production_tonnes.unwrap();
        assert!((production - expected).abs() < 1e-6);
        assert_eq!(metrics.total_resource_tonnes, Some(1_200_000.0));
        assert_eq!(metrics.resource_grade, Some(1.5));
        assert_eq!(metrics.resource_grade_unit, Some(GradeUnit::GramsPerTonne));
    }

    #[test]
    fn test_ounce_production() {
        let metrics = extract_metrics("Annual production of 250,000 ounces of gold.");
        let expected = 250_000.0 * 31.1034768 / 1e6;
        assert!((metrics.annual_production_tonnes.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sustaining_capital_not_taken_as_initial() {
        let metrics = extract_metrics("Sustaining capital costs of $310 million over the life of mine.");
        assert_eq!(metrics.sustaining_capex_usd_m, Some(310.0));
        assert_eq!(metrics.capex_usd_m, None);
    }

    #[test]
    fn test_costs_per_tonne_and_payback() {
        let metrics = extract_metrics(
            "Operating costs of US$5,450/t LCE and AISC of $6,100 per tonne. \
             Payback period of 3.2 years. Proven and Probable reserves of 45 Mt.",
        );
        assert_eq!(metrics.opex_usd_per_tonne, Some(5450.0));
        assert_eq!(metrics.aisc_usd_per_tonne, Some(6100.0));
        assert_eq!(metrics.payback_years, Some(3.2));
        assert_eq!(metrics.total_reserve_tonnes, Some(45_000_000.0));
    }

    #[test]
    fn test_year_first_mine_life() {
        let metrics = extract_metrics("It supports a 22-year mine life.");
        assert_eq!(metrics.mine_life_years, Some(22.0));
    }
}
