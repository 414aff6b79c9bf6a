//! Physical and monetary unit conversion.

/// Grams in one troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1034768;

/// Kilograms in one avoirdupois pound.
pub const POUND_KG: f64 = 0.45359237;

/// Kilograms in one metric tonne.
pub const TONNE_KG: f64 = 1000.0;

/// Mass unit as written in a report, including its scale prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassUnit {
    Kilogram,
    Tonne,
    ThousandTonnes,
    MillionTonnes,
    Pound,
    ThousandPounds,
    MillionPounds,
    Ounce,
    ThousandOunces,
    MillionOunces,
}

impl MassUnit {
    /// Parse a unit token such as `tonnes`, `Mt`, `million lbs` or `koz`.
    ///
    /// Short and long "tons" are read as metric tonnes.
    pub fn from_token(token: &str) -> Option<Self> {
        let raw = token.trim().trim_end_matches('.');
        // Case matters only for the bare abbreviations.
        match raw {
            "Mt" | "MT" => return Some(Self::MillionTonnes),
            "kt" | "Kt" | "KT" => return Some(Self::ThousandTonnes),
            "t" => return Some(Self::Tonne),
            "Mlb" | "Mlbs" => return Some(Self::MillionPounds),
            "Moz" => return Some(Self::MillionOunces),
            _ => {}
        }

        let lowered = raw.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let (scale, unit) = match words.as_slice() {
            [unit] => (None, *unit),
            [scale, unit] => (Some(*scale), *unit),
            _ => return None,
        };

        let base = match unit {
            "kg" | "kgs" | "kilogram" | "kilograms" => Self::Kilogram,
            "t" | "tonne" | "tonnes" | "ton" | "tons" | "tpa" | "tpy" | "mtpa" => Self::Tonne,
            "kt" | "ktpa" => Self::ThousandTonnes,
            "lb" | "lbs" | "pound" | "pounds" => Self::Pound,
            "klb" | "klbs" => Self::ThousandPounds,
            "mlb" | "mlbs" => Self::MillionPounds,
            "oz" | "ounce" | "ounces" => Self::Ounce,
            "koz" => Self::ThousandOunces,
            "moz" => Self::MillionOunces,
            _ => return None,
        };

        // "mtpa" is million tonnes per annum.
        let base = if unit == "mtpa" {
            Self::MillionTonnes
        } else {
            base
        };

        match scale {
            None => Some(base),
            Some("thousand") | Some("k") => base.scaled_by_thousand(),
            Some("million") | Some("m") | Some("mm") => base.scaled_by_million(),
            Some(_) => None,
        }
    }

    fn scaled_by_thousand(self) -> Option<Self> {
        match self {
            Self::Tonne => Some(Self::ThousandTonnes),
            Self::Pound => Some(Self::ThousandPounds),
            Self::Ounce => Some(Self::ThousandOunces),
            Self::Kilogram => Some(Self::Tonne),
            _ => None,
        }
    }

    fn scaled_by_million(self) -> Option<Self> {
        match self {
            Self::Tonne => Some(Self::MillionTonnes),
            Self::Pound => Some(Self::MillionPounds),
            Self::Ounce => Some(Self::MillionOunces),
            Self::Kilogram => Some(Self::ThousandTonnes),
            _ => None,
        }
    }

    /// Metric tonnes in one of this unit.
    pub fn tonnes_per_unit(&self) -> f64 {
        let pound_t = POUND_KG / TONNE_KG;
        let ounce_t = TROY_OUNCE_GRAMS / 1_000_000.0;
        match self {
            Self::Kilogram => 1.0 / TONNE_KG,
            Self::Tonne => 1.0,
            Self::ThousandTonnes => 1e3,
            Self::MillionTonnes => 1e6,
            Self::Pound => pound_t,
            Self::ThousandPounds => pound_t * 1e3,
            Self::MillionPounds => pound_t * 1e6,
            Self::Ounce => ounce_t,
            Self::ThousandOunces => ounce_t * 1e3,
            Self::MillionOunces => ounce_t * 1e6,
        }
    }

    pub fn to_tonnes(&self, value: f64) -> f64 {
        value * self.tonnes_per_unit()
    }
}

/// Scale word attached to a currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyScale {
    Units,
    Thousand,
    Million,
    Billion,
}

impl MoneyScale {
    /// Parse `million`, `M`, `MM`, `billion`, `B`, `bn`, `thousand`, `k`.
    /// An empty token means plain dollars.
    pub fn from_token(token: &str) -> Option<Self> {
        let raw = token.trim().trim_end_matches('.');
        match raw {
            "" => return Some(Self::Units),
            "M" | "MM" | "m" | "mm" => return Some(Self::Million),
            "B" | "b" | "bn" | "Bn" | "BN" => return Some(Self::Billion),
            "k" | "K" => return Some(Self::Thousand),
            _ => {}
        }
        match raw.to_lowercase().as_str() {
            "thousand" => Some(Self::Thousand),
            "million" | "millions" | "mln" => Some(Self::Million),
            "billion" | "billions" => Some(Self::Billion),
            _ => None,
        }
    }

    /// Convert an amount at this scale to millions.
    pub fn to_millions(&self, value: f64) -> f64 {
        match self {
            Self::Units => value / 1_000_000.0,
            Self::Thousand => value / 1_000.0,
            Self::Million => value,
            Self::Billion => value * 1_000.0,
        }
    }
}

/// Parse a number as printed in a report: thousands separators, optional
/// leading currency symbol, unicode minus. Returns None for anything else.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(|c: char| c == '$' || c == '~')
        .chars()
        .filter(|c| *c != ',' && *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
