//! Prompts for structured project extraction.

/// System instruction: domain, output schema and the null rule.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract facts about a single mining project from an excerpt of a regulatory technical report (NI 43-101, S-K 1300 or JORC style).

Respond with ONE JSON object and nothing else. Use exactly these keys:
{
  "project_name": string | null,
  "country": string | null,
  "jurisdiction": string | null,
  "commodity": string | null,
  "stage": string | null,
  "description": string | null,
  "capex_usd_m": number | null,
  "sustaining_capex_usd_m": number | null,
  "post_tax_npv_usd_m": number | null,
  "pre_tax_npv_usd_m": number | null,
  "irr_percent": number | null,
  "pre_tax_irr_percent": number | null,
  "payback_years": number | null,
  "mine_life_years": number | null,
  "annual_production_tonnes": number | null,
  "total_resource_tonnes": number | null,
  "total_reserve_tonnes": number | null,
  "resource_grade": number | null,
  "resource_grade_unit": "%" | "g/t" | "oz/t" | "ppm" | null,
  "opex_usd_per_tonne": number | null,
  "aisc_usd_per_tonne": number | null
}

Rules:
- Use null when a value is not stated in the excerpt. Never guess.
- Money in millions of US dollars; masses in metric tonnes; irr as a percentage number.
- "stage" is one of: Exploration, Resource Definition, PEA, Pre-Feasibility, Feasibility, Permitting, Construction, Production, Care and Maintenance, Closed.
- "description" is at most two sentences describing the project.
- "jurisdiction" is the state, province or region; "country" is the country."#;

/// User message template; `{title}` and `{content}` are replaced.
pub const EXTRACTION_USER_PROMPT: &str = r#"Document title: {title}

Excerpt:
{content}"#;
